//! Upscaler Vertex Library
//!
//! Remote half of the upscale pipeline:
//! - [`auth`]: service-account key -> signed RS256 assertion -> bearer token
//! - [`prediction`]: authenticated `:predict` call to the upscale model

pub mod auth;
pub mod prediction;

pub use auth::{
    AccessToken, AccessTokenSource, Credential, ServiceAccountTokenSource, TokenProvider,
};
pub use prediction::{ImageUpscaler, PredictionClient, PredictionEndpoint, UpscaleParameters};
