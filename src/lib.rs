//! postwall gives a small social blogging client its account and post
//! operations, forwarded to an identity provider and a document store.

#![forbid(unsafe_code)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod ports;
pub mod telemetry;

use std::sync::Arc;

use adapters::clock::SystemClock;
use adapters::identity_toolkit::IdentityToolkit;
use adapters::memory::{MemoryDocumentStore, MemoryIdentity};
use adapters::postgres::{self as pg, PgDocumentStore};
use adapters::telemetry::TracingTelemetry;
use gateway::{AuthGateway, PostGateway};
use ports::{DocumentStore, IdentityProvider, TelemetryPort};

/// Gateways sharing one configuration.
#[derive(Clone)]
pub struct Gateways {
    pub config: Arc<config::Configuration>,
    pub auth: AuthGateway,
    pub posts: PostGateway,
}

/// Build gateways from `config`.
///
/// Without an identity API key or a `postgres` entry, the matching in-memory
/// adapter is used instead.
pub async fn initialize_state(
    config: Arc<config::Configuration>,
) -> Result<Gateways, Box<dyn std::error::Error + Send + Sync>> {
    let telemetry: Arc<dyn TelemetryPort> = Arc::new(TracingTelemetry::new());

    let identity: Arc<dyn IdentityProvider> = match &config.identity {
        Some(cfg @ config::Identity {
            api_key: Some(key), ..
        }) if !key.is_empty() => {
            let mut toolkit = IdentityToolkit::new(key.clone())
                .endpoint(&cfg.endpoint)
                .tenant(cfg.tenant_id.clone());
            if let Some(uri) = &cfg.request_uri {
                toolkit = toolkit.request_uri(uri);
            }
            tracing::info!(
                endpoint = %cfg.endpoint,
                "identity toolkit configured"
            );
            Arc::new(toolkit)
        },
        _ => {
            tracing::warn!(
                "missing `identity.api_key`, accounts are kept in memory"
            );
            Arc::new(MemoryIdentity::new())
        },
    };

    let store: Arc<dyn DocumentStore> = match &config.postgres {
        Some(cfg) => {
            let store = PgDocumentStore::connect(
                &cfg.address,
                cfg.username.as_deref().unwrap_or(pg::DEFAULT_CREDENTIALS),
                cfg.password.as_deref().unwrap_or(pg::DEFAULT_CREDENTIALS),
                cfg.database.as_deref().unwrap_or(pg::DEFAULT_DATABASE_NAME),
                cfg.pool_size.unwrap_or(pg::DEFAULT_POOL_SIZE),
            )
            .await?;

            // execute migrations scripts on start.
            store.migrate().await?;
            Arc::new(store)
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry, posts are kept in memory"
            );
            Arc::new(MemoryDocumentStore::new())
        },
    };

    let auth = AuthGateway::new(identity, Arc::clone(&telemetry));
    let posts = PostGateway::new(store, Arc::new(SystemClock::new()), telemetry)
        .collection(config.posts_collection.clone())
        .date_format(&config.date_format);

    Ok(Gateways {
        config,
        auth,
        posts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let config = Arc::new(config::Configuration::default());
        let state = initialize_state(config).await.unwrap();

        let ctx = state
            .auth
            .register_with_email_and_password(
                &state.auth.auth(),
                "peba",
                "peba@demais.com",
                "pebademais",
            )
            .await
            .unwrap();
        let uid = ctx.current_user().unwrap().uid.clone();

        let post = state
            .posts
            .create_post(&ctx, "oie galera", "musica")
            .await
            .unwrap();
        state.posts.like(&post.id, &uid).await.unwrap();
        state
            .posts
            .update_post(&post.id, "novo texto")
            .await
            .unwrap();

        let stored = state.posts.post_by_id(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.author, uid);
        assert_eq!(stored.name, "peba");
        assert_eq!(stored.text, "novo texto");
        assert_eq!(stored.like, [uid]);

        state.posts.delete_post(&post.id).await.unwrap();
        assert!(state.posts.get_all_posts().await.unwrap().is_empty());

        let ctx = state.auth.logoff(&ctx).await.unwrap();
        assert!(ctx.current_user().is_none());
    }

    #[tokio::test]
    async fn test_empty_api_key_keeps_accounts_in_memory() {
        let config: config::Configuration =
            serde_yaml::from_str("identity:\n  api_key: \"\"\n").unwrap();
        let state = initialize_state(Arc::new(config)).await.unwrap();

        // The REST adapter would fail with `PopupUnavailable`.
        let err = state
            .auth
            .login_with_google(&state.auth.auth())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            error::GatewayError::Identity(
                ports::IdentityError::UnsupportedProvider(_)
            )
        ));
    }
}
