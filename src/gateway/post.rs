//! Post operations forwarded to the document store.

use std::fmt::Write;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{
    AuthContext, CollectionRef, DEFAULT_DATE_FORMAT, DocumentRef, Post,
    PostPatch, QuerySnapshot,
};
use crate::error::{GatewayError, Result};
use crate::ports::{Clock, DocumentStore, TelemetryPort};

pub const DEFAULT_COLLECTION: &str = "posts";

/// Render `date` with `format`. `None` if `format` needs more than a date,
/// such as a time or a zone.
fn format_date(date: NaiveDate, format: &str) -> Option<String> {
    let mut text = String::new();
    write!(text, "{}", date.format(format)).ok()?;
    Some(text)
}

/// Create, read, update, delete and like posts.
#[derive(Clone)]
pub struct PostGateway {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    telemetry: Arc<dyn TelemetryPort>,
    posts: CollectionRef,
    date_format: String,
}

impl PostGateway {
    /// Create a new [`PostGateway`] on the `posts` collection.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        telemetry: Arc<dyn TelemetryPort>,
    ) -> Self {
        Self {
            store,
            clock,
            telemetry,
            posts: CollectionRef::new(DEFAULT_COLLECTION),
            date_format: DEFAULT_DATE_FORMAT.to_owned(),
        }
    }

    /// Update the collection holding posts.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.posts = CollectionRef::new(name);
        self
    }

    /// Update the `strftime` format of the creation date.
    ///
    /// A format that cannot render a plain date is ignored.
    pub fn date_format(mut self, format: &str) -> Self {
        if format_date(self.clock.today(), format).is_some() {
            self.date_format = format.to_owned();
        } else {
            tracing::warn!(
                %format,
                "invalid date format, keeping {}",
                self.date_format
            );
        }
        self
    }

    /// Reference of post `id`.
    pub fn reference(&self, id: &str) -> DocumentRef {
        self.posts.doc(id)
    }

    /// Publish a post written by the signed-in user. Returns its reference.
    pub async fn create_post(
        &self,
        ctx: &AuthContext,
        text: &str,
        tag: &str,
    ) -> Result<DocumentRef> {
        let author = ctx.current_user().ok_or(GatewayError::NotSignedIn)?;
        let date = format_date(self.clock.today(), &self.date_format)
            .unwrap_or_default();
        let post = Post::draft(author, text, tag, date);

        let reference = self.store.add(&self.posts, post.to_fields()?).await?;
        self.telemetry.record_post_event(&reference.id, "created");

        Ok(reference)
    }

    /// Replace the text of a post.
    pub async fn update_post(&self, id: &str, new_text: &str) -> Result<()> {
        let reference = self.reference(id);
        let patch = PostPatch::Text(new_text.to_owned());
        self.store.update(&reference, patch.to_fields()).await?;
        self.telemetry.record_post_event(id, "updated");

        Ok(())
    }

    pub async fn delete_post(&self, id: &str) -> Result<()> {
        let reference = self.reference(id);
        self.store.delete(&reference).await?;
        self.telemetry.record_post_event(id, "deleted");

        Ok(())
    }

    /// Fetch a single post. `None` if it does not exist.
    pub async fn post_by_id(&self, id: &str) -> Result<Option<Post>> {
        let snapshot = self.store.get(&self.reference(id)).await?;
        Ok(snapshot.data::<Post>()?)
    }

    /// Fetch every post, as returned by the store.
    pub async fn get_all_posts(&self) -> Result<QuerySnapshot> {
        Ok(self.store.get_all(&self.posts).await?)
    }

    /// Fetch and decode every post, keeping store order.
    pub async fn posts(&self) -> Result<Vec<(String, Post)>> {
        Ok(self.get_all_posts().await?.decode::<Post>()?)
    }

    /// Append `user_id` to the likes of a post.
    ///
    /// Read then write without a transaction: concurrent likes on the same
    /// post may overwrite each other.
    pub async fn like(&self, post_id: &str, user_id: &str) -> Result<()> {
        let mut like = self.likes(post_id).await?;
        like.push(user_id.to_owned());

        self.write_likes(post_id, like).await?;
        self.telemetry.record_post_event(post_id, "liked");
        Ok(())
    }

    /// Remove every like of `user_id` from a post.
    pub async fn unlike(&self, post_id: &str, user_id: &str) -> Result<()> {
        let mut like = self.likes(post_id).await?;
        like.retain(|id| id != user_id);

        self.write_likes(post_id, like).await?;
        self.telemetry.record_post_event(post_id, "unliked");
        Ok(())
    }

    async fn likes(&self, post_id: &str) -> Result<Vec<String>> {
        let snapshot = self.store.get(&self.reference(post_id)).await?;
        if !snapshot.exists() {
            return Err(GatewayError::PostNotFound {
                id: post_id.to_owned(),
            });
        }

        Ok(snapshot.field::<Vec<String>>("like")?.unwrap_or_default())
    }

    async fn write_likes(
        &self,
        post_id: &str,
        like: Vec<String>,
    ) -> Result<()> {
        tracing::debug!(post_id, likes = like.len(), "writing likes");
        self.store
            .update(&self.reference(post_id), PostPatch::Like(like).to_fields())
            .await?;
        Ok(())
    }
}
