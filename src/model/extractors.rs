//! Built-in extractors.

use super::{CURRENT_PAGE, ExtractContext, Extracted, ModelError, ModelExtractor, TAG, TagEntry, unpluralize};
use crate::{
    config::SiteConfig, document::Document, parser::DATA_FIELD, store::compare_by_date,
    utils::date,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Output uri of the page listing documents tagged `tag`.
pub fn tag_uri(config: &SiteConfig, tag: &str) -> String {
    let name = if config.tags.sanitize {
        tag.replace(' ', "-")
    } else {
        tag.to_owned()
    };
    format!("{}/{name}{}", config.tags.path, config.build.output_extension)
}

fn sorted(mut docs: Vec<Document>) -> Vec<Document> {
    docs.sort_by(compare_by_date);
    docs
}

fn current_tag<'a>(ctx: &'a ExtractContext<'_>) -> Option<&'a str> {
    ctx.model.get(TAG).and_then(Value::as_str)
}

/// `<type>s`: every document of the type, drafts included.
pub struct TypedDocuments;

impl ModelExtractor for TypedDocuments {
    fn extract(&self, ctx: &ExtractContext<'_>, key: &str) -> Result<Extracted, ModelError> {
        let doc_type = unpluralize(ctx.types, key)?;
        Ok(Extracted::Documents(ctx.store.all_by_type(&doc_type)))
    }
}

/// `published_<type>s`.
pub struct PublishedTypedDocuments;

impl ModelExtractor for PublishedTypedDocuments {
    fn extract(&self, ctx: &ExtractContext<'_>, key: &str) -> Result<Extracted, ModelError> {
        let plural = key.strip_prefix("published_").unwrap_or(key);
        let doc_type = unpluralize(ctx.types, plural)?;
        Ok(Extracted::Documents(ctx.store.published_by_type(&doc_type)))
    }
}

/// `published_posts`, sliced to the current page of a paginated index.
pub struct PublishedPosts;

impl ModelExtractor for PublishedPosts {
    fn extract(&self, ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        let posts = ctx.store.published_by_type("post");

        let render = &ctx.config.render;
        let page = ctx.model.get(CURRENT_PAGE).and_then(Value::as_u64);
        let Some(page) = page.filter(|_| render.paginate && render.posts_per_page > 0) else {
            return Ok(Extracted::Documents(posts));
        };

        let start = (page.saturating_sub(1) as usize).saturating_mul(render.posts_per_page);
        let slice = posts
            .into_iter()
            .skip(start)
            .take(render.posts_per_page)
            .collect();
        Ok(Extracted::Documents(slice))
    }
}

/// `published_content`: published documents of every registered type.
pub struct PublishedContent;

impl ModelExtractor for PublishedContent {
    fn extract(&self, ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        let docs = ctx
            .types
            .document_types()
            .iter()
            .flat_map(|doc_type| ctx.store.published_by_type(doc_type))
            .collect();
        Ok(Extracted::Documents(sorted(docs)))
    }
}

/// `all_content`: every document except data files.
pub struct AllContent;

impl ModelExtractor for AllContent {
    fn extract(&self, ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        let data_type = &ctx.config.content.data_type;
        let docs = ctx
            .types
            .document_types()
            .iter()
            .filter(|doc_type| *doc_type != data_type)
            .flat_map(|doc_type| ctx.store.all_by_type(doc_type))
            .collect();
        Ok(Extracted::Documents(sorted(docs)))
    }
}

/// `alltags`: distinct tags of published posts.
pub struct AllTags;

impl ModelExtractor for AllTags {
    fn extract(&self, ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        let mut tags: Vec<String> = ctx
            .store
            .published_by_type("post")
            .into_iter()
            .flat_map(|doc| doc.tags)
            .collect();
        tags.sort();
        tags.dedup();
        Ok(Extracted::Names(tags))
    }
}

/// `tag_posts`: published posts carrying the model's `tag`.
pub struct TagPosts;

impl ModelExtractor for TagPosts {
    fn extract(&self, ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        let docs = current_tag(ctx)
            .map(|tag| ctx.store.published_by_tag(tag, Some("post")))
            .unwrap_or_default();
        Ok(Extracted::Documents(docs))
    }
}

/// `tagged_documents`: published documents of any type carrying the model's `tag`.
pub struct TaggedDocuments;

impl ModelExtractor for TaggedDocuments {
    fn extract(&self, ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        let docs = current_tag(ctx)
            .map(|tag| ctx.store.published_by_tag(tag, None))
            .unwrap_or_default();
        Ok(Extracted::Documents(docs))
    }
}

/// `tags`: one entry per distinct published tag.
pub struct Tags;

impl ModelExtractor for Tags {
    fn extract(&self, ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        let tags = ctx
            .store
            .distinct_tags()
            .into_iter()
            .map(|name| TagEntry {
                uri: tag_uri(ctx.config, &name),
                tagged_posts: ctx.store.published_by_tag(&name, Some("post")),
                tagged_documents: ctx.store.published_by_tag(&name, None),
                name,
            })
            .collect();
        Ok(Extracted::Tags(tags))
    }
}

/// `db`: the store itself.
pub struct Db;

impl ModelExtractor for Db {
    fn extract(&self, ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        Ok(Extracted::Store(Arc::clone(ctx.store)))
    }
}

/// `published_date`: the time of the bake.
pub struct PublishedDate;

impl ModelExtractor for PublishedDate {
    fn extract(&self, _ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        Ok(Extracted::Date(date::now()))
    }
}

/// `data`: parsed data files keyed by their path under the data folder.
pub struct DataFiles;

impl ModelExtractor for DataFiles {
    fn extract(&self, ctx: &ExtractContext<'_>, _key: &str) -> Result<Extracted, ModelError> {
        let files: Map<String, Value> = ctx
            .store
            .all_by_type(&ctx.config.content.data_type)
            .into_iter()
            .map(|mut doc| {
                let value = doc.extra.remove(DATA_FIELD).unwrap_or_default();
                (doc.source_uri, value)
            })
            .collect();
        Ok(Extracted::Data(Value::Object(files)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_uri() {
        let mut config = SiteConfig::default();
        assert_eq!(tag_uri(&config, "rust"), "tags/rust.html");

        config.tags.sanitize = true;
        config.tags.path = "topics".into();
        assert_eq!(tag_uri(&config, "open source"), "topics/open-source.html");
    }
}
