//! rostro-auth — Facial authentication against the remote recognition service.
//!
//! The service does the recognition; this crate uploads a captured photo as
//! multipart, normalizes every outcome to [`FacialAuthResponse`], and keeps
//! the persisted "face registered" flag.

pub mod client;
pub mod image_ref;
pub mod session;

pub use client::{AuthError, FacialAuthClient};
pub use image_ref::ImageRef;
pub use rostro_core::FacialAuthResponse;
pub use session::{FaceSession, FACE_FLAG_KEY};
