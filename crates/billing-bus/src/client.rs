//! AMQP-backed [`BusClient`]. Registers RPC handlers as consumers on a
//! per-method queue, performs synchronous RPC calls over RabbitMQ's
//! `amq.rabbitmq.reply-to` direct-reply pseudo-queue, and fire-and-forget
//! publishes for audit writes.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use billing_types::method::Priority;
use futures_util::StreamExt;
use lapin::{
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, QueueDeclareOptions
    },
    types::{AMQPValue, FieldTable, ShortString},
    BasicProperties, Channel, Connection, ConnectionProperties
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{envelope::parse_reply, error::BusError, Handler};

const REPLY_TO_QUEUE: &str = "amq.rabbitmq.reply-to";
const DEFAULT_EXPIRATION: Duration = Duration::from_secs(10);

/// A live connection to the message bus, with pooled channels reused across
/// concurrently running handler tasks. Created once per worker process.
pub struct AmqpBusClient {
    connection: Connection,
    channel: Channel,
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<Value>>>>,
    registrations: Mutex<Vec<JoinHandle<()>>>
}

impl AmqpBusClient {
    pub async fn connect(uri: &str) -> Result<Self, BusError> {
        let connection = Connection::connect(uri, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        let client = Self {
            connection,
            channel,
            pending: Arc::new(Mutex::new(HashMap::new())),
            registrations: Mutex::new(Vec::new())
        };
        client.listen_for_replies().await?;
        Ok(client)
    }

    async fn listen_for_replies(&self) -> Result<(), BusError> {
        let mut consumer = self
            .channel
            .basic_consume(
                REPLY_TO_QUEUE,
                &format!("rating-engine-replies-{}", Uuid::new_v4()),
                BasicConsumeOptions { no_ack: true, ..Default::default() },
                FieldTable::default()
            )
            .await?;

        let pending = self.pending.clone();
        tokio::spawn(async move {
            while let Some(delivery) = consumer.next().await {
                let Ok(delivery) = delivery else { continue };
                let Some(correlation_id) = correlation_id(&delivery) else { continue };
                let Ok(body) = serde_json::from_slice::<Value>(&delivery.data) else { continue };

                if let Some(sender) = pending.lock().remove(&correlation_id) {
                    let _ = sender.send(body);
                }
            }
        });

        Ok(())
    }

}

fn correlation_id(delivery: &Delivery) -> Option<String> {
    delivery
        .properties
        .correlation_id()
        .as_ref()
        .map(|id| id.as_str().to_string())
}

/// The surface the engine/dispatcher need from the message bus: register a
/// handler per method name, call a method synchronously, or fire a
/// low-priority publish without awaiting a reply.
#[async_trait]
pub trait BusClient: Send + Sync {
    async fn rpc_call(
        &self,
        method: &str,
        payload: Value,
        expiration: Duration,
        priority: Priority
    ) -> Result<Value, BusError>;

    async fn rpc_publish(&self, method: &str, payload: Value, priority: Priority) -> Result<(), BusError>;

    async fn rpc_register(&self, method: &str, auto_delete: bool, handler: Handler) -> Result<(), BusError>;
}

#[async_trait]
impl BusClient for AmqpBusClient {
    async fn rpc_call(
        &self,
        method: &str,
        payload: Value,
        expiration: Duration,
        priority: Priority
    ) -> Result<Value, BusError> {
        let correlation_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(correlation_id.clone(), tx);

        let body = serde_json::to_vec(&payload)?;
        let properties = BasicProperties::default()
            .with_reply_to(REPLY_TO_QUEUE.into())
            .with_correlation_id(correlation_id.clone().into())
            .with_priority(priority.as_u8())
            .with_expiration(expiration.as_millis().to_string().into())
            .with_content_type("application/json".into());

        self.channel
            .basic_publish(
                "",
                method,
                BasicPublishOptions::default(),
                &body,
                properties
            )
            .await?
            .await?;

        let reply = tokio::time::timeout(expiration, rx).await.map_err(|_| {
            self.pending.lock().remove(&correlation_id);
            BusError::Timeout(expiration)
        })?;

        let body = reply.map_err(|_| BusError::Timeout(expiration))?;
        parse_reply(body)
    }

    async fn rpc_publish(&self, method: &str, payload: Value, priority: Priority) -> Result<(), BusError> {
        let body = serde_json::to_vec(&payload)?;
        let properties =
            BasicProperties::default().with_priority(priority.as_u8()).with_content_type("application/json".into());

        self.channel.basic_publish("", method, BasicPublishOptions::default(), &body, properties).await?.await?;
        Ok(())
    }

    async fn rpc_register(&self, method: &str, auto_delete: bool, handler: Handler) -> Result<(), BusError> {
        let queue_options = QueueDeclareOptions { auto_delete, ..QueueDeclareOptions::default() };
        let mut args = FieldTable::default();
        args.insert(ShortString::from("x-max-priority"), AMQPValue::ShortShortInt(Priority::High.as_u8() as i8));
        self.channel.queue_declare(method, queue_options, args).await?;

        let mut consumer = self
            .channel
            .basic_consume(method, &format!("{method}-{}", Uuid::new_v4()), BasicConsumeOptions::default(), FieldTable::default())
            .await?;

        let channel = self.channel.clone();
        let method = method.to_string();
        let task = tokio::spawn(async move {
            while let Some(delivery) = consumer.next().await {
                let Ok(delivery) = delivery else { continue };
                let reply_to = delivery.properties.reply_to().clone();
                let correlation_id = delivery.properties.correlation_id().clone();

                let request: Value = match serde_json::from_slice(&delivery.data) {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(%method, error = %err, "failed to decode request payload");
                        if let Err(err) = delivery.nack(BasicNackOptions::default()).await {
                            error!(%method, error = %err, "failed to nack malformed delivery");
                        }
                        continue
                    }
                };

                let response = handler(request).await;

                if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
                    error!(%method, error = %err, "failed to ack delivery");
                }

                if let (Some(reply_to), Some(correlation_id)) = (reply_to, correlation_id) {
                    let body = match serde_json::to_vec(&response) {
                        Ok(body) => body,
                        Err(err) => {
                            error!(%method, error = %err, "failed to encode response payload");
                            continue
                        }
                    };
                    let properties = BasicProperties::default()
                        .with_correlation_id(correlation_id)
                        .with_content_type("application/json".into());
                    if let Err(err) =
                        channel.basic_publish("", reply_to.as_str(), BasicPublishOptions::default(), &body, properties).await
                    {
                        error!(%method, error = %err, "failed to publish reply");
                    }
                }

                debug!(%method, "handled delivery");
            }
        });

        self.registrations.lock().push(task);
        Ok(())
    }
}

impl AmqpBusClient {
    /// Stops accepting new deliveries and waits for in-flight handler tasks
    /// to finish, then closes the channel and connection.
    pub async fn shutdown(&self) -> Result<(), BusError> {
        for task in self.registrations.lock().drain(..) {
            task.abort();
        }
        self.channel.close(200, "shutting down").await?;
        self.connection.close(200, "shutting down").await?;
        Ok(())
    }
}

pub(crate) fn default_expiration() -> Duration {
    DEFAULT_EXPIRATION
}
