//! AWS SQS compensator.
//!
//! Resolves the queue URL from the ARN (`GetQueueUrl` with the owning
//! account), then deletes fulfilled messages with `DeleteMessageBatch`.
//! Clients are built per region taken from the ARN; queue URLs are cached
//! for the lifetime of the compensator (one warm Lambda container).

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::types::DeleteMessageBatchRequestEntry;
use aws_sdk_sqs::Client as SqsClient;
use backon::{ExponentialBuilder, Retryable};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{CompensationEntry, CompensationError, Compensator, QueueArn, Result};
use crate::config::{AwsConfig, CompensationConfig};
use crate::utils::retry::compensation_backoff;

/// Maximum entries accepted by one `DeleteMessageBatch` call.
pub const MAX_BATCH_ENTRIES: usize = 10;

/// Deletes fulfilled messages from SQS.
pub struct SqsCompensator {
    sdk_config: aws_config::SdkConfig,
    backoff: ExponentialBuilder,
    /// Clients by region.
    clients: RwLock<HashMap<String, SqsClient>>,
    /// Queue URLs by queue ARN.
    queue_urls: RwLock<HashMap<String, String>>,
}

impl SqsCompensator {
    /// Load AWS configuration from the default provider chain.
    pub async fn new(aws: &AwsConfig, compensation: &CompensationConfig) -> Self {
        let mut aws_config_builder = aws_config::defaults(BehaviorVersion::latest());

        if let Some(ref region) = aws.region {
            aws_config_builder =
                aws_config_builder.region(aws_config::Region::new(region.clone()));
        }

        if let Some(ref endpoint) = aws.endpoint_url {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);
        }

        let sdk_config = aws_config_builder.load().await;

        info!(
            region = ?aws.region,
            endpoint = ?aws.endpoint_url,
            max_attempts = compensation.max_attempts,
            "SQS compensator ready"
        );

        Self {
            sdk_config,
            backoff: compensation_backoff(compensation),
            clients: RwLock::new(HashMap::new()),
            queue_urls: RwLock::new(HashMap::new()),
        }
    }

    /// Get or build a client for the queue's region.
    async fn client_for(&self, region: &str) -> SqsClient {
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(region) {
                return client.clone();
            }
        }

        let conf = aws_sdk_sqs::config::Builder::from(&self.sdk_config)
            .region(aws_sdk_sqs::config::Region::new(region.to_string()))
            .build();
        let client = SqsClient::from_conf(conf);

        let mut clients = self.clients.write().await;
        clients
            .entry(region.to_string())
            .or_insert(client)
            .clone()
    }

    /// Get (cached) or resolve the queue URL.
    async fn queue_url(&self, client: &SqsClient, queue_arn: &str, arn: &QueueArn) -> Result<String> {
        {
            let urls = self.queue_urls.read().await;
            if let Some(url) = urls.get(queue_arn) {
                return Ok(url.clone());
            }
        }

        let result = client
            .get_queue_url()
            .queue_name(&arn.name)
            .queue_owner_aws_account_id(&arn.account_id)
            .send()
            .await
            .map_err(|e| CompensationError::QueueUrl {
                queue: queue_arn.to_string(),
                message: e.to_string(),
            })?;

        let url = result
            .queue_url()
            .ok_or_else(|| CompensationError::QueueUrl {
                queue: queue_arn.to_string(),
                message: "GetQueueUrl returned no URL".to_string(),
            })?
            .to_string();

        {
            let mut urls = self.queue_urls.write().await;
            urls.insert(queue_arn.to_string(), url.clone());
        }

        debug!(queue = %queue_arn, url = %url, "Resolved queue URL");
        Ok(url)
    }

    /// Delete one chunk of at most [`MAX_BATCH_ENTRIES`] entries.
    async fn delete_chunk(
        client: &SqsClient,
        queue_url: &str,
        queue_arn: &str,
        chunk: &[CompensationEntry],
    ) -> Result<()> {
        let entries = chunk
            .iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(&entry.id)
                    .receipt_handle(&entry.receipt_handle)
                    .build()
                    .map_err(|e| CompensationError::InvalidEntry {
                        queue: queue_arn.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let output = client
            .delete_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| CompensationError::DeleteBatch {
                queue: queue_arn.to_string(),
                message: e.to_string(),
            })?;

        let failed_ids: Vec<String> = output.failed().iter().map(|f| f.id().to_string()).collect();
        if !failed_ids.is_empty() {
            return Err(CompensationError::PartialDelete {
                queue: queue_arn.to_string(),
                failed_ids,
            });
        }

        Ok(())
    }
}

/// Whether a compensation failure is worth another attempt.
///
/// Only a failed `DeleteMessageBatch` call is transient. Per-entry rejections
/// and malformed entries fail the same way on every attempt.
pub(crate) fn is_transient(error: &CompensationError) -> bool {
    matches!(error, CompensationError::DeleteBatch { .. })
}

/// Run `delete` over `entries` in chunks of [`MAX_BATCH_ENTRIES`], retrying
/// each chunk with `backoff` while the failure is transient.
///
/// Stops at the first chunk that still fails.
pub(crate) async fn delete_in_chunks<'a, F, Fut>(
    queue_arn: &str,
    entries: &'a [CompensationEntry],
    backoff: ExponentialBuilder,
    delete: F,
) -> Result<()>
where
    F: Fn(&'a [CompensationEntry]) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    for chunk in entries.chunks(MAX_BATCH_ENTRIES) {
        (|| delete(chunk))
            .retry(backoff)
            .when(is_transient)
            .notify(|e: &CompensationError, delay: Duration| {
                warn!(queue = %queue_arn, error = %e, ?delay, "Retrying delete batch");
            })
            .await?;
    }
    Ok(())
}

#[async_trait]
impl Compensator for SqsCompensator {
    async fn compensate(&self, queue_arn: &str, entries: &[CompensationEntry]) -> Result<()> {
        let arn = QueueArn::parse(queue_arn)?;
        let client = self.client_for(&arn.region).await;
        let queue_url = self.queue_url(&client, queue_arn, &arn).await?;

        delete_in_chunks(queue_arn, entries, self.backoff, |chunk| {
            Self::delete_chunk(&client, &queue_url, queue_arn, chunk)
        })
        .await?;

        info!(queue = %queue_arn, deleted = entries.len(), "Deleted fulfilled messages");
        Ok(())
    }
}
