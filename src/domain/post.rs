//! Post domain entity.

use serde::{Deserialize, Serialize};

use super::document::Fields;
use super::session::CurrentUser;

pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Blog post as saved on the document store.
///
/// Missing fields decode to their empty value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    /// uid of the writer.
    pub author: String,
    /// Display name of the writer when the post was created.
    pub name: String,
    pub text: String,
    pub tag: String,
    /// Creation date, already formatted.
    #[serde(rename = "data")]
    pub date: String,
    /// uids that liked this post, oldest first. Duplicates are kept.
    pub like: Vec<String>,
}

impl Post {
    /// Draft a new post written by `author`, with no likes.
    pub fn draft(
        author: &CurrentUser,
        text: impl Into<String>,
        tag: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            author: author.uid.clone(),
            name: author.display_name.clone().unwrap_or_default(),
            text: text.into(),
            tag: tag.into(),
            date: date.into(),
            like: Vec::new(),
        }
    }

    /// Document fields for this post.
    pub fn to_fields(&self) -> Result<Fields, serde_json::Error> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "post serialized to {other}, expected an object"
            ))),
        }
    }
}

/// Partial update of a stored post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostPatch {
    Text(String),
    Like(Vec<String>),
}

impl PostPatch {
    /// Document fields touched by this patch.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        match self {
            PostPatch::Text(text) => {
                fields.insert("text".into(), text.clone().into());
            },
            PostPatch::Like(like) => {
                fields.insert("like".into(), like.clone().into());
            },
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_draft_fields() {
        let author = CurrentUser::new("123").with_display_name("nome");
        let fields = Post::draft(&author, "oie galera", "musica", "19/10/2026")
            .to_fields()
            .unwrap();

        assert_eq!(
            serde_json::Value::Object(fields),
            json!({
                "name": "nome",
                "author": "123",
                "data": "19/10/2026",
                "tag": "musica",
                "text": "oie galera",
                "like": [],
            })
        );
    }

    #[test]
    fn test_draft_without_display_name() {
        let post = Post::draft(&CurrentUser::new("123"), "a", "b", "c");
        assert_eq!(post.name, "");
    }

    #[test]
    fn test_missing_like_defaults_to_empty() {
        let post: Post = serde_json::from_value(json!({
            "author": "1",
            "name": "n",
            "text": "t",
            "tag": "g",
            "data": "d",
        }))
        .unwrap();
        assert!(post.like.is_empty());
    }

    #[test]
    fn test_partial_document() {
        let post: Post = serde_json::from_value(json!({
            "author": "1",
            "text": "t",
        }))
        .unwrap();
        assert_eq!(post.author, "1");
        assert_eq!(post.text, "t");
        assert!(post.tag.is_empty());
        assert!(post.date.is_empty());
    }

    #[test]
    fn test_patch_fields() {
        let fields =
            PostPatch::Like(vec!["algum".into(), "id".into()]).to_fields();
        assert_eq!(
            serde_json::Value::Object(fields),
            json!({ "like": ["algum", "id"] })
        );
    }
}
