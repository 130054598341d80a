use crate::api::{Resource, Transport};
use crate::error::ApiError;
use crate::model::{RegisterRequest, User};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

/// What the server hands out on a successful login or registration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AuthGrant {
    pub user: User,
    pub token: String,
}

/// The typed endpoints of the BudgetZen API.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Transport,
}

impl Client {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// `GET /expenses` or `GET /charges`: the full listing for the signed-in user.
    pub async fn list<R: Resource>(&self) -> Result<Vec<R>, ApiError> {
        let payload = self.transport.request(Method::GET, R::PATH, None).await?;
        let records = match take_field(payload, "data")? {
            Value::Array(records) => records,
            other => {
                return Err(ApiError::Malformed(format!(
                    "expected a list of {}s, got {other}",
                    R::NAME
                )))
            }
        };
        let entities = records
            .into_iter()
            .map(R::from_wire)
            .collect::<Result<Vec<R>, ApiError>>()?;
        debug!("listed {} {}s", entities.len(), R::NAME);
        Ok(entities)
    }

    /// `POST` to the collection. Returns the entity with its server-assigned id.
    pub async fn create<R: Resource>(&self, draft: &R::Draft) -> Result<R, ApiError> {
        let body = R::draft_to_wire(draft)?;
        let payload = self
            .transport
            .request(Method::POST, R::PATH, Some(&body))
            .await?;
        R::from_wire(take_field(payload, "data")?)
    }

    /// `PUT` the full entity to its item path.
    pub async fn update<R: Resource>(&self, entity: &R) -> Result<R, ApiError> {
        let body = entity.to_wire()?;
        let payload = self
            .transport
            .request(Method::PUT, &R::item_path(entity.id()), Some(&body))
            .await?;
        R::from_wire(take_field(payload, "data")?)
    }

    /// `DELETE` the entity at its item path. The confirmation message is only logged.
    pub async fn delete<R: Resource>(&self, id: u64) -> Result<(), ApiError> {
        let payload = self
            .transport
            .request(Method::DELETE, &R::item_path(id), None)
            .await?;
        if let Some(message) = payload.get("message").and_then(Value::as_str) {
            debug!("{message}");
        }
        Ok(())
    }

    /// `GET /auth/me`: confirms the identity behind the current credential.
    pub async fn me(&self) -> Result<User, ApiError> {
        let payload = self.transport.request(Method::GET, "/auth/me", None).await?;
        parse_field(payload, "user")
    }

    /// `POST /auth/login`.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let body = json!({ "email": email, "password": password });
        let payload = self
            .transport
            .request(Method::POST, "/auth/login", Some(&body))
            .await?;
        grant(payload)
    }

    /// `POST /auth/register`.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant, ApiError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::Malformed(format!("unable to serialize request body: {e}")))?;
        let payload = self
            .transport
            .request(Method::POST, "/auth/register", Some(&body))
            .await?;
        grant(payload)
    }

    /// `POST /auth/logout`: revokes the current credential on the server.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.transport
            .request(Method::POST, "/auth/logout", None)
            .await
            .map(|_| ())
    }
}

fn grant(payload: Value) -> Result<AuthGrant, ApiError> {
    let token = match payload.get("token") {
        Some(Value::String(token)) if !token.is_empty() => token.clone(),
        _ => return Err(ApiError::Malformed("the response has no token".into())),
    };
    let user = parse_field(payload, "user")?;
    Ok(AuthGrant { user, token })
}

/// Removes `name` from a JSON object payload. A missing or null field is a malformed response.
fn take_field(payload: Value, name: &str) -> Result<Value, ApiError> {
    match payload {
        Value::Object(mut map) => match map.remove(name) {
            Some(Value::Null) | None => Err(ApiError::Malformed(format!(
                "the response has no `{name}` field"
            ))),
            Some(value) => Ok(value),
        },
        other => Err(ApiError::Malformed(format!(
            "expected a JSON object with a `{name}` field, got {other}"
        ))),
    }
}

fn parse_field<T: DeserializeOwned>(payload: Value, name: &str) -> Result<T, ApiError> {
    let value = take_field(payload, name)?;
    serde_json::from_value(value)
        .map_err(|e| ApiError::Malformed(format!("unable to read `{name}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiRequest, Backend, RawResponse, TokenCell};
    use crate::model::{Charge, Expense};
    use std::sync::Arc;

    struct Fixed(u16, &'static str);

    #[async_trait::async_trait]
    impl Backend for Fixed {
        async fn exchange(&self, _: ApiRequest) -> Result<RawResponse, ApiError> {
            Ok(RawResponse::new(self.0, self.1))
        }
    }

    fn client(status: u16, text: &'static str) -> Client {
        Client::new(Transport::new(Arc::new(Fixed(status, text)), TokenCell::new()))
    }

    #[tokio::test]
    async fn test_list_maps_records() {
        let c = client(
            200,
            r#"{"data":[{"id":1,"description":"Loyer","amount":"850.00","category":"Logement","due_date":"2024-08-01","is_paid":false}]}"#,
        );
        let charges: Vec<Charge> = c.list().await.unwrap();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].description, "Loyer");
    }

    #[tokio::test]
    async fn test_missing_data_is_malformed() {
        let c = client(200, r#"{"items":[]}"#);
        let err = c.list::<Expense>().await.unwrap_err();
        assert!(err.is_network_class());

        let c = client(200, "");
        let err = c.list::<Expense>().await.unwrap_err();
        assert!(err.is_network_class());

        let c = client(200, r#"{"data":{"id":1}}"#);
        let err = c.list::<Expense>().await.unwrap_err();
        assert!(err.is_network_class());
    }

    #[tokio::test]
    async fn test_login_requires_token() {
        let c = client(200, r#"{"user":{"id":1,"name":"A","email":"a@b.c"}}"#);
        assert!(c.login("a@b.c", "pw").await.unwrap_err().is_network_class());

        let c = client(
            200,
            r#"{"user":{"id":1,"name":"A","email":"a@b.c","avatar_url":null},"token":"t"}"#,
        );
        let grant = c.login("a@b.c", "pw").await.unwrap();
        assert_eq!(grant.token, "t");
        assert_eq!(grant.user.email, "a@b.c");
        assert_eq!(grant.user.avatar_url, None);
    }

    #[tokio::test]
    async fn test_delete_accepts_any_success_body() {
        assert!(client(200, r#"{"message":"Expense removed."}"#)
            .delete::<Expense>(3)
            .await
            .is_ok());
        assert!(client(204, "").delete::<Expense>(3).await.is_ok());
    }

    #[tokio::test]
    async fn test_validation_message_passes_through() {
        let c = client(422, r#"{"message":"The description field is required."}"#);
        let err = c.me().await.unwrap_err();
        assert_eq!(err.to_string(), "The description field is required.");
    }
}
