//! Request-origin extraction for audit metadata.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{header::USER_AGENT, request::Parts},
};
use catalog_core::audit::RequestInfo;

/// The caller's remote address and `User-Agent`.
///
/// The address is only known when the server is run with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub RequestInfo);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let ip_address = parts
      .extensions
      .get::<ConnectInfo<SocketAddr>>()
      .map(|ConnectInfo(addr)| addr.ip().to_string());
    let user_agent = parts
      .headers
      .get(USER_AGENT)
      .and_then(|v| v.to_str().ok())
      .map(str::to_owned);
    Ok(Self(RequestInfo { ip_address, user_agent }))
  }
}
