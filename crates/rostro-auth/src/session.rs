//! Face login/registration state held by the client between calls.

use crate::client::FacialAuthClient;
use crate::image_ref::ImageRef;
use rostro_core::FacialAuthResponse;
use rostro_store::{KeyValueStore, StoreHealth, StoredValue};
use std::sync::Arc;

/// Storage key of the "this device registered a face" flag.
pub const FACE_FLAG_KEY: &str = "hasRegisteredFace";

pub struct FaceSession {
    client: FacialAuthClient,
    registered: StoredValue<bool>,
    error: Option<String>,
}

impl FaceSession {
    /// Build a session and read the registration flag once.
    pub async fn open(client: FacialAuthClient, store: Arc<dyn KeyValueStore>) -> Self {
        let registered = StoredValue::open(store, FACE_FLAG_KEY, false).await;
        Self {
            client,
            registered,
            error: None,
        }
    }

    /// Register a face for `cuil`. On success the flag is persisted.
    pub async fn register(&mut self, cuil: &str, image: &ImageRef) -> FacialAuthResponse {
        self.error = None;
        if cuil.trim().is_empty() {
            return self.fail(FacialAuthResponse::failure("CUIL is required"));
        }

        let response = self.client.register_with_face(cuil, image).await;
        if !response.success {
            return self.fail(response);
        }

        self.registered.save(true).await;
        tracing::info!(health = ?self.registered.health(), "face registration recorded");
        response
    }

    /// Log in by recognizing the face in `image`.
    pub async fn login(&mut self, image: &ImageRef) -> FacialAuthResponse {
        self.error = None;
        let response = self.client.login_with_face(image).await;
        if !response.success {
            return self.fail(response);
        }
        response
    }

    /// Forget the local registration flag. The remote enrollment is untouched.
    pub async fn forget(&mut self) {
        self.registered.remove().await;
    }

    fn fail(&mut self, response: FacialAuthResponse) -> FacialAuthResponse {
        self.error = Some(
            response
                .message
                .clone()
                .unwrap_or_else(|| "facial authentication failed".to_string()),
        );
        response
    }

    pub fn has_registered_face(&self) -> bool {
        *self.registered.value()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn store_health(&self) -> &StoreHealth {
        self.registered.health()
    }

    pub fn client(&self) -> &FacialAuthClient {
        &self.client
    }
}
