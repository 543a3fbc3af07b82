//! Conversion history API.
//!
//! Records conversion results posted by clients, lists them back and
//! deletes them by id. No conversion is computed here: the body of a
//! create request is coerced into a [`NewConversion`] and handed to the
//! [`ConversionStore`] held in [`AppState`].
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .merge(conversion::routes())
//!     .with_state(app_state);
//! ```
//!
//! [`NewConversion`]: crate::model::NewConversion
//! [`ConversionStore`]: crate::store::ConversionStore
//! [`AppState`]: crate::handler::AppState

mod handler;
mod routes;

pub use routes::routes;
