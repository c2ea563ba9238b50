use chrono::{DateTime, Utc};
use rostro_core::{seed_products, OperationResult, Product, ProductForm, ValidationError};
use rostro_store::{KeyValueStore, StoreError, StoreHealth, StoredValue};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// Storage key holding the JSON-encoded product collection.
pub const PRODUCTS_KEY: &str = "products";

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("invalid product: {0}")]
    Invalid(#[from] ValidationError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("repository task exited")]
    ChannelClosed,
}

/// Simulated latency applied before each mutation takes effect.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub add_latency: Duration,
    pub update_latency: Duration,
    pub delete_latency: Duration,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            add_latency: Duration::from_millis(1000),
            update_latency: Duration::from_millis(1000),
            delete_latency: Duration::from_millis(500),
        }
    }
}

impl RepositoryConfig {
    /// No simulated latency.
    pub fn immediate() -> Self {
        Self {
            add_latency: Duration::ZERO,
            update_latency: Duration::ZERO,
            delete_latency: Duration::ZERO,
        }
    }
}

/// Snapshot published by the repository task after every change.
#[derive(Debug, Clone)]
pub struct RepositoryState {
    pub products: Vec<Product>,
    /// Initial load from the store has not finished.
    pub loading: bool,
    /// A mutation is being applied.
    pub busy: bool,
    /// Message from the last failed mutation, until cleared.
    pub error: Option<String>,
    /// The store has not accepted the latest collection.
    pub dirty: bool,
    pub health: StoreHealth,
}

/// Messages sent from handles to the repository task.
enum RepositoryRequest {
    Add {
        form: ProductForm,
        reply: oneshot::Sender<OperationResult>,
    },
    Update {
        id: String,
        form: ProductForm,
        reply: oneshot::Sender<OperationResult>,
    },
    Delete {
        id: String,
        reply: oneshot::Sender<OperationResult>,
    },
    Sync {
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    ClearError {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Clone-safe handle to the repository task.
#[derive(Clone)]
pub struct ProductRepository {
    tx: mpsc::Sender<RepositoryRequest>,
    state: watch::Receiver<RepositoryState>,
}

impl ProductRepository {
    /// Add a product with a fresh id and creation time.
    pub async fn add_product(&self, form: ProductForm) -> OperationResult {
        self.mutate(|reply| RepositoryRequest::Add { form, reply })
            .await
    }

    /// Replace the editable fields of product `id`.
    ///
    /// An unknown `id` leaves the collection unchanged and still succeeds.
    pub async fn update_product(&self, id: &str, form: ProductForm) -> OperationResult {
        let id = id.to_string();
        self.mutate(|reply| RepositoryRequest::Update { id, form, reply })
            .await
    }

    /// Remove product `id`. Removing an absent id succeeds.
    pub async fn delete_product(&self, id: &str) -> OperationResult {
        let id = id.to_string();
        self.mutate(|reply| RepositoryRequest::Delete { id, reply })
            .await
    }

    async fn mutate(
        &self,
        build: impl FnOnce(oneshot::Sender<OperationResult>) -> RepositoryRequest,
    ) -> OperationResult {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(build(reply_tx)).await.is_err() {
            return OperationResult::failed(RepositoryError::ChannelClosed.to_string());
        }
        reply_rx
            .await
            .unwrap_or_else(|_| OperationResult::failed(RepositoryError::ChannelClosed.to_string()))
    }

    /// First product whose barcode matches, from the latest snapshot.
    pub fn get_product_by_barcode(&self, barcode: &str) -> Option<Product> {
        self.state
            .borrow()
            .products
            .iter()
            .find(|p| p.barcode == barcode)
            .cloned()
    }

    pub fn products(&self) -> Vec<Product> {
        self.state.borrow().products.clone()
    }

    /// True while the initial load or a mutation is in progress.
    pub fn is_loading(&self) -> bool {
        let state = self.state.borrow();
        state.loading || state.busy
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.borrow().dirty
    }

    pub fn health(&self) -> StoreHealth {
        self.state.borrow().health.clone()
    }

    pub fn snapshot(&self) -> RepositoryState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<RepositoryState> {
        self.state.clone()
    }

    /// Wait until the initial load from the store has finished.
    pub async fn ready(&self) -> Result<(), RepositoryError> {
        let mut rx = self.state.clone();
        rx.wait_for(|s| !s.loading)
            .await
            .map(|_| ())
            .map_err(|_| RepositoryError::ChannelClosed)
    }

    /// Clear the error left by the last failed mutation.
    ///
    /// Returns once the cleared state has been published.
    pub async fn clear_error(&self) -> Result<(), RepositoryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RepositoryRequest::ClearError { reply: reply_tx })
            .await
            .map_err(|_| RepositoryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RepositoryError::ChannelClosed)
    }

    /// Retry persisting the collection if the store missed the last write.
    pub async fn sync(&self) -> Result<(), RepositoryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RepositoryRequest::Sync { reply: reply_tx })
            .await
            .map_err(|_| RepositoryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RepositoryError::ChannelClosed)??;
        Ok(())
    }

    /// Stop the repository task after queued requests are handled.
    ///
    /// Makes one last attempt to persist unsynced changes. Other handles see
    /// `ChannelClosed` afterwards.
    pub async fn shutdown(&self) -> Result<(), RepositoryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RepositoryRequest::Shutdown { reply: reply_tx })
            .await
            .map_err(|_| RepositoryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RepositoryError::ChannelClosed)
    }
}

/// State owned by the repository task.
struct Repository {
    products: StoredValue<Vec<Product>>,
    config: RepositoryConfig,
    error: Option<String>,
    last_created_at: Option<DateTime<Utc>>,
    state_tx: watch::Sender<RepositoryState>,
}

/// Spawn the repository on the current tokio runtime.
///
/// The collection starts as the two seed products and is replaced by the
/// persisted one once the initial load completes. Mutations are applied one
/// at a time in arrival order.
pub fn spawn_repository(store: Arc<dyn KeyValueStore>, config: RepositoryConfig) -> ProductRepository {
    let products = StoredValue::new(store, PRODUCTS_KEY, seed_products(Utc::now()));
    let (state_tx, state_rx) = watch::channel(RepositoryState {
        products: products.value().clone(),
        loading: true,
        busy: false,
        error: None,
        dirty: false,
        health: StoreHealth::Healthy,
    });
    let (tx, mut rx) = mpsc::channel::<RepositoryRequest>(32);

    let mut repo = Repository {
        products,
        config,
        error: None,
        last_created_at: None,
        state_tx,
    };

    tokio::spawn(async move {
        repo.products.load().await;
        tracing::info!(count = repo.products.value().len(), "product repository loaded");
        repo.publish(false);

        while let Some(req) = rx.recv().await {
            match req {
                RepositoryRequest::Add { form, reply } => {
                    repo.begin();
                    let outcome = repo.add(form).await;
                    let _ = reply.send(repo.finish("add", outcome));
                }
                RepositoryRequest::Update { id, form, reply } => {
                    repo.begin();
                    let outcome = repo.update(id, form).await;
                    let _ = reply.send(repo.finish("update", outcome));
                }
                RepositoryRequest::Delete { id, reply } => {
                    repo.begin();
                    let outcome = repo.delete(id).await;
                    let _ = reply.send(repo.finish("delete", outcome));
                }
                RepositoryRequest::Sync { reply } => {
                    let result = repo.products.sync().await;
                    repo.publish(false);
                    let _ = reply.send(result);
                }
                RepositoryRequest::ClearError { reply } => {
                    repo.error = None;
                    repo.publish(false);
                    let _ = reply.send(());
                }
                RepositoryRequest::Shutdown { reply } => {
                    if let Err(e) = repo.products.sync().await {
                        tracing::warn!(error = %e, "shutting down with unsynced products");
                    }
                    repo.publish(false);
                    let _ = reply.send(());
                    break;
                }
            }
        }
        tracing::info!("product repository stopped");
    });

    ProductRepository {
        tx,
        state: state_rx,
    }
}

impl Repository {
    /// Clear the previous error and mark a mutation as in flight.
    fn begin(&mut self) {
        self.error = None;
        self.publish(true);
    }

    /// Map a mutation outcome to the uniform result shape, recording the
    /// repository-level error on failure.
    fn finish(&mut self, op: &'static str, outcome: Result<(), RepositoryError>) -> OperationResult {
        let result = match outcome {
            Ok(()) => OperationResult::ok(),
            Err(e) => {
                tracing::warn!(op, error = %e, "product operation failed");
                let message = format!("failed to {op} product: {e}");
                self.error = Some(message.clone());
                OperationResult::failed(message)
            }
        };
        self.publish(false);
        result
    }

    async fn add(&mut self, form: ProductForm) -> Result<(), RepositoryError> {
        form.validate()?;
        tokio::time::sleep(self.config.add_latency).await;

        let product = Product::from_form(uuid::Uuid::new_v4().to_string(), form, self.next_created_at());
        tracing::info!(id = %product.id, barcode = %product.barcode, "adding product");

        let mut next = self.products.value().clone();
        next.push(product);
        self.products.save(next).await;
        Ok(())
    }

    async fn update(&mut self, id: String, form: ProductForm) -> Result<(), RepositoryError> {
        form.validate()?;
        tokio::time::sleep(self.config.update_latency).await;

        let mut next = self.products.value().clone();
        match next.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                if product.barcode != form.barcode {
                    tracing::warn!(
                        id = %id,
                        stored = %product.barcode,
                        requested = %form.barcode,
                        "barcode cannot change after creation; keeping stored value"
                    );
                }
                product.apply(form);
                tracing::info!(id = %id, "updated product");
            }
            None => tracing::debug!(id = %id, "update for unknown product id; collection unchanged"),
        }

        self.products.save(next).await;
        Ok(())
    }

    async fn delete(&mut self, id: String) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.config.delete_latency).await;

        let mut next = self.products.value().clone();
        let before = next.len();
        next.retain(|p| p.id != id);
        tracing::info!(id = %id, removed = before - next.len(), "deleted product");

        self.products.save(next).await;
        Ok(())
    }

    /// Current time, never earlier than the previous product's creation time.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let created_at = match self.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_created_at = Some(created_at);
        created_at
    }

    fn publish(&self, busy: bool) {
        self.state_tx.send_replace(RepositoryState {
            products: self.products.value().clone(),
            loading: self.products.is_loading(),
            busy,
            error: self.error.clone(),
            dirty: self.products.is_dirty(),
            health: self.products.health().clone(),
        });
    }
}
