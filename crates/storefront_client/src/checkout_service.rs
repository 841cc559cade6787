#![forbid(unsafe_code)]

use storefront_contracts::checkout::{CheckoutRequest, RedirectTarget};
use storefront_contracts::session::SessionToken;

use crate::error::ClientError;
use crate::http;
use crate::wire::{CheckoutBody, CheckoutWireRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutHttpConfig {
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl CheckoutHttpConfig {
    pub fn from_env() -> Option<Self> {
        let endpoint = http::env_endpoint("STOREFRONT_CHECKOUT_ENDPOINT")?;
        Some(Self {
            endpoint,
            connect_timeout_ms: http::env_ms(
                "STOREFRONT_HTTP_CONNECT_TIMEOUT_MS",
                100..=60_000,
                http::CONNECT_TIMEOUT_MS_DEFAULT,
            ),
            request_timeout_ms: http::env_ms(
                "STOREFRONT_HTTP_REQUEST_TIMEOUT_MS",
                100..=120_000,
                http::REQUEST_TIMEOUT_MS_DEFAULT,
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutServiceRuntime {
    Http(CheckoutHttpConfig),
    /// Acks with a deterministic redirect target echoing the submitted
    /// total; no network involved.
    Loopback,
    AlwaysFail {
        detail: String,
    },
}

impl CheckoutServiceRuntime {
    pub fn from_env_or_loopback() -> Self {
        if let Some(config) = CheckoutHttpConfig::from_env() {
            return Self::Http(config);
        }
        Self::Loopback
    }

    pub fn submit(
        &self,
        token: &SessionToken,
        request: &CheckoutRequest,
    ) -> Result<RedirectTarget, ClientError> {
        match self {
            Self::Loopback => Ok(RedirectTarget::v1(
                format!("loopback://pay/{}", request.cart_id.as_str()),
                Some(format!("loopback_ref:{}", request.cart_id.as_str())),
                request.total_minor,
            )?),
            Self::AlwaysFail { detail } => {
                Err(ClientError::transport("connection", None, detail.clone()))
            }
            Self::Http(config) => http_submit(config, token, request),
        }
    }
}

fn http_submit(
    config: &CheckoutHttpConfig,
    token: &SessionToken,
    request: &CheckoutRequest,
) -> Result<RedirectTarget, ClientError> {
    let payload = serde_json::to_value(CheckoutWireRequest::from_request(request))
        .map_err(|_| ClientError::transport("json_parse", None, "checkout payload encode failed"))?;
    let agent = http::build_agent(config.connect_timeout_ms, config.request_timeout_ms);
    let url = format!("{}/checkout", config.endpoint.trim_end_matches('/'));
    let response = agent
        .post(&url)
        .set("content-type", "application/json")
        .set("accept", "application/json")
        .set("authorization", &format!("Bearer {}", token.as_str()))
        .send_json(payload)
        .map_err(http::transport_error)?;
    let body: CheckoutBody = serde_json::from_reader(response.into_reader()).map_err(|_| {
        ClientError::transport("json_parse", None, "checkout body is not valid json")
    })?;
    if !body.success {
        return Err(ClientError::transport(
            "rejected",
            None,
            body.message
                .unwrap_or_else(|| "checkout rejected by provider".to_string()),
        ));
    }
    Ok(body.into_redirect_target(request.total_minor)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_contracts::cart::{CartId, ProductId};
    use storefront_contracts::checkout::{CheckoutLine, PaymentRouting};
    use storefront_contracts::session::UserId;

    fn request() -> CheckoutRequest {
        CheckoutRequest::v1(
            CartId::new("cart_1").unwrap(),
            UserId::new("user_1").unwrap(),
            vec![CheckoutLine::v1(ProductId::new("product_a").unwrap(), 10_000, 2).unwrap()],
            20_000,
            PaymentRouting::default_v1(),
        )
        .unwrap()
    }

    #[test]
    fn at_checkout_service_01_loopback_echoes_submitted_total() {
        let token = SessionToken::new("tok_test").unwrap();
        let target = CheckoutServiceRuntime::Loopback
            .submit(&token, &request())
            .unwrap();
        assert_eq!(target.total_minor, 20_000);
        assert_eq!(target.redirect_url, "loopback://pay/cart_1");
    }

    #[test]
    fn at_checkout_service_02_always_fail_surfaces_transport() {
        let token = SessionToken::new("tok_test").unwrap();
        let out = CheckoutServiceRuntime::AlwaysFail {
            detail: "provider_down".to_string(),
        }
        .submit(&token, &request());
        assert_eq!(
            out,
            Err(ClientError::transport("connection", None, "provider_down"))
        );
    }
}
