//! HTTP client for the calendar store.
//!
//! Talks to the calendaring service's JSON API with basic auth. Entries are
//! keyed by event id: the relational store and the calendar share one id
//! space, so a show's event row and its schedule entry carry the same id.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use reqwest::StatusCode;
use showgrid_core::{CalendarEntry, CalendarError, CalendarStore};
use std::future::Future;
use std::pin::Pin;

/// Connection settings for the calendar service.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// Base URL of the calendar service (e.g., "http://localhost:36000").
    pub base_url: String,

    /// Basic-auth user.
    pub username: String,

    /// Basic-auth password.
    pub password: String,

    /// Name of the calendar holding the event entries.
    pub calendar: String,
}

impl CalendarConfig {
    /// Create a configuration for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the basic-auth credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the calendar name.
    #[must_use]
    pub fn with_calendar(mut self, calendar: impl Into<String>) -> Self {
        self.calendar = calendar.into();
        self
    }

    fn entry_url(&self, id: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/calendars/{}/events/{id}", self.calendar)
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:36000".to_string(),
            username: "user".to_string(),
            password: "password".to_string(),
            calendar: "events".to_string(),
        }
    }
}

/// [`CalendarStore`] implementation over the calendar service's HTTP API.
pub struct HttpCalendarStore {
    config: CalendarConfig,
    client: reqwest::Client,
}

impl HttpCalendarStore {
    /// Create a store over the given configuration.
    #[must_use]
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn do_get(&self, id: String) -> Result<CalendarEntry, CalendarError> {
        let url = self.config.entry_url(&id);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                Err(CalendarError::Data(format!("no calendar entry for {id}")))
            }
            status if status.is_success() => {
                response.json::<CalendarEntry>().await.map_err(transport)
            }
            status => Err(CalendarError::Service(format!(
                "calendar returned {status} for {url}"
            ))),
        }
    }

    async fn do_delete(&self, id: String) -> Result<(), CalendarError> {
        let url = self.config.entry_url(&id);
        let response = self
            .client
            .delete(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            // Already gone; deletion is idempotent.
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => {
                tracing::warn!(entry_id = %id, %status, "calendar delete failed");
                Err(CalendarError::Service(format!(
                    "calendar returned {status} for {url}"
                )))
            }
        }
    }
}

fn transport(err: reqwest::Error) -> CalendarError {
    CalendarError::Service(err.to_string())
}

impl CalendarStore for HttpCalendarStore {
    fn get_entry(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<CalendarEntry, CalendarError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(self.do_get(id))
    }

    fn delete_entry(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), CalendarError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(self.do_delete(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn entry_url_joins_base_calendar_and_id() {
        let config = CalendarConfig::new("http://calendar:36000").with_calendar("shows");
        assert_eq!(
            config.entry_url("e1"),
            "http://calendar:36000/calendars/shows/events/e1"
        );
    }

    #[test]
    fn entry_url_tolerates_trailing_slash() {
        let config = CalendarConfig::new("http://calendar:36000/");
        assert_eq!(
            config.entry_url("e1"),
            "http://calendar:36000/calendars/events/events/e1"
        );
    }

    #[test]
    fn builders_override_defaults() {
        let config = CalendarConfig::default()
            .with_credentials("emi", "secret")
            .with_calendar("schedule");
        assert_eq!(config.username, "emi");
        assert_eq!(config.password, "secret");
        assert_eq!(config.calendar, "schedule");
    }
}
