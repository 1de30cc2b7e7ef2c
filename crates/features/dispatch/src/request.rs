use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::event::Event;
use crate::notice::{Notifier, TracingNotifier, Translations};
use crate::path::BasePath;
use moe_domain::config::ClientSettings;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a single [`Requester::request`] call ended with.
///
/// Exactly one of these happens per call: a `Ready` event was published,
/// or one notice was shown.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// 2xx with a JSON body; the body was published on `<path>:ready`.
    Ready(Value),
    /// The server answered 403.
    Denied,
    /// Transport error, any other status, or an undecodable body.
    Failed,
}

/// Posts form data to the server and republishes JSON answers.
#[derive(Debug, Clone)]
pub struct Requester {
    http: reqwest::Client,
    origin: String,
    base: BasePath,
    dispatcher: Dispatcher,
    notifier: Arc<dyn Notifier>,
    translations: Translations,
}

impl Requester {
    /// Creates a requester for `settings.origin` mounted at `settings.base_path`.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidOrigin`] if the origin is not an absolute URL
    /// and [`DispatchError::Http`] if the HTTP client cannot be built.
    pub fn new(dispatcher: Dispatcher, settings: &ClientSettings) -> Result<Self, DispatchError> {
        let origin = Url::parse(&settings.origin).map_err(|e| DispatchError::InvalidOrigin {
            message: format!("'{}': {e}", settings.origin).into(),
            context: Some("client.origin".into()),
        })?;
        if origin.cannot_be_a_base() {
            return Err(DispatchError::InvalidOrigin {
                message: format!("'{}' cannot be used as a base URL", settings.origin).into(),
                context: Some("client.origin".into()),
            });
        }

        let http = reqwest::Client::builder().build().map_err(|source| DispatchError::Http {
            source,
            context: Some("Failed to build HTTP client".into()),
        })?;

        Ok(Self {
            http,
            origin: settings.origin.trim_end_matches('/').to_owned(),
            base: BasePath::new(settings.base_path.clone()),
            dispatcher,
            notifier: Arc::new(TracingNotifier),
            translations: Translations::new(settings.translations.clone()),
        })
    }

    /// Replaces the default [`TracingNotifier`].
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub const fn base_path(&self) -> &BasePath {
        &self.base
    }

    #[must_use]
    pub const fn translations(&self) -> &Translations {
        &self.translations
    }

    /// POSTs `params` form-encoded to `path` under the base path.
    ///
    /// On success the decoded body is published as [`Event::Ready`] keyed by the
    /// unprefixed `path`. A 403 shows the access-denied notice; every other
    /// failure shows the generic one. Nothing is retried.
    pub async fn request<P>(&self, path: &str, params: &P) -> RequestOutcome
    where
        P: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.origin, self.base.resolve(path));
        debug!(%url, "POST");

        let response = match self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "Request failed");
                return self.failed();
            },
        };

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            debug!(%url, "Request denied");
            self.notifier.notice(&self.translations.denied_notice());
            return RequestOutcome::Denied;
        }
        if !status.is_success() {
            warn!(%url, %status, "Request rejected");
            return self.failed();
        }

        match response.json::<Value>().await {
            Ok(body) => {
                self.dispatcher
                    .publish(Event::Ready { path: path.to_owned(), body: body.clone() });
                RequestOutcome::Ready(body)
            },
            Err(e) => {
                warn!(%url, error = %e, "Response is not JSON");
                self.failed()
            },
        }
    }

    fn failed(&self) -> RequestOutcome {
        self.notifier.notice(&self.translations.error_notice());
        RequestOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_origin_is_rejected() {
        let settings = ClientSettings { origin: "localhost".to_owned(), ..ClientSettings::default() };
        let err = Requester::new(Dispatcher::default(), &settings).expect_err("must fail");
        assert!(matches!(err, DispatchError::InvalidOrigin { .. }));
        assert!(err.to_string().contains("client.origin"), "{err}");
    }

    #[test]
    fn trailing_slash_on_origin_is_dropped() {
        let settings =
            ClientSettings { origin: "http://example.test/".to_owned(), ..ClientSettings::default() };
        let requester = Requester::new(Dispatcher::default(), &settings).unwrap();
        assert_eq!(requester.origin, "http://example.test");
        assert!(requester.base_path().is_root());
    }
}
