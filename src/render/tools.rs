//! Site-wide artifacts.
//!
//! | Tool       | Template key          | Output                          | Enabled by        |
//! |------------|-----------------------|---------------------------------|-------------------|
//! | `index`    | `masterindex`         | `index_file`, `<n>/index_file`  | `render.index`    |
//! | `archive`  | `archive`             | `archive_file`                  | `render.archive`  |
//! | `feed`     | `feed`                | `feed_file`                     | `render.feed`     |
//! | `tags`     | `tag`, `tagsindex`    | `<tags.path>/<tag><ext>`        | `tags.render`     |
//! | `sitemap`  | `sitemap`             | `sitemap_file`                  | `render.sitemap`  |
//! | `error404` | `error404`            | `error404_file`                 | `render.error404` |
//!
//! Each tool returns the number of artifacts it produced, 0 when disabled.

use super::{RenderError, Renderer};
use crate::{
    model::{CURRENT_PAGE, TAG, TemplateModel, tag_uri},
    template::error_chain,
};
use serde_json::{Value, json};

/// Produces one family of site-wide artifacts.
pub trait RenderingTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, renderer: &Renderer) -> Result<usize, RenderError>;
}

/// Every built-in tool, in rendering order.
pub fn tools() -> Vec<Box<dyn RenderingTool>> {
    vec![
        Box::new(Index),
        Box::new(Archive),
        Box::new(Feed),
        Box::new(Tags),
        Box::new(Sitemap),
        Box::new(Error404),
    ]
}

// ============================================================================
// Index
// ============================================================================

/// The master index, optionally split into pages.
///
/// Page 1 is `index_file`, page `n` is `<n>/index_file`. File names in the
/// model are relative to the site root, so templates prefix them with
/// `content.rootpath`.
pub struct Index;

impl RenderingTool for Index {
    fn name(&self) -> &'static str {
        "index"
    }

    fn render(&self, renderer: &Renderer) -> Result<usize, RenderError> {
        let render = &renderer.config().render;
        if !render.index {
            return Ok(0);
        }

        let posts = renderer.store().published_count("post");
        if !render.paginate || posts == 0 {
            renderer.render_artifact("masterindex", &render.index_file, TemplateModel::new())?;
            return Ok(1);
        }

        let pages = posts.div_ceil(render.posts_per_page);
        for page in 1..=pages {
            let file = if page == 1 {
                render.index_file.clone()
            } else {
                format!("{page}/{}", render.index_file)
            };

            let mut model = TemplateModel::new();
            model.set(CURRENT_PAGE, json!(page));
            model.set("numberOfPages", json!(pages));
            model.set("previousFileName", previous_file_name(page));
            model.set("nextFileName", next_file_name(page, pages));
            renderer.render_artifact("masterindex", &file, model)?;
        }
        Ok(pages)
    }
}

fn previous_file_name(page: usize) -> Value {
    match page {
        1 => Value::Null,
        2 => json!(""),
        _ => json!(format!("{}/", page - 1)),
    }
}

fn next_file_name(page: usize, pages: usize) -> Value {
    if page < pages {
        json!(format!("{}/", page + 1))
    } else {
        Value::Null
    }
}

// ============================================================================
// Archive, feed, sitemap, 404
// ============================================================================

pub struct Archive;

impl RenderingTool for Archive {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn render(&self, renderer: &Renderer) -> Result<usize, RenderError> {
        let render = &renderer.config().render;
        if !render.archive {
            return Ok(0);
        }
        renderer.render_artifact("archive", &render.archive_file, TemplateModel::new())?;
        Ok(1)
    }
}

/// The feed lists at most `feed_count` of the newest published posts.
pub struct Feed;

impl RenderingTool for Feed {
    fn name(&self) -> &'static str {
        "feed"
    }

    fn render(&self, renderer: &Renderer) -> Result<usize, RenderError> {
        let render = &renderer.config().render;
        if !render.feed {
            return Ok(0);
        }

        let mut posts = renderer.store().published_by_type("post");
        posts.truncate(render.feed_count);

        let mut model = TemplateModel::new();
        model.insert("published_posts", &posts)?;
        renderer.render_artifact("feed", &render.feed_file, model)?;
        Ok(1)
    }
}

pub struct Sitemap;

impl RenderingTool for Sitemap {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn render(&self, renderer: &Renderer) -> Result<usize, RenderError> {
        let render = &renderer.config().render;
        if !render.sitemap {
            return Ok(0);
        }
        renderer.render_artifact("sitemap", &render.sitemap_file, TemplateModel::new())?;
        Ok(1)
    }
}

pub struct Error404;

impl RenderingTool for Error404 {
    fn name(&self) -> &'static str {
        "error404"
    }

    fn render(&self, renderer: &Renderer) -> Result<usize, RenderError> {
        let render = &renderer.config().render;
        if !render.error404 {
            return Ok(0);
        }
        renderer.render_artifact("error404", &render.error404_file, TemplateModel::new())?;
        Ok(1)
    }
}

// ============================================================================
// Tags
// ============================================================================

/// One page per published tag, plus the optional tags index.
///
/// Only tag pages are counted. A failing tag page does not stop the others.
pub struct Tags;

impl RenderingTool for Tags {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn render(&self, renderer: &Renderer) -> Result<usize, RenderError> {
        let config = renderer.config();
        if !config.tags.render {
            return Ok(0);
        }

        let tags = renderer.store().distinct_tags();
        let mut errors = Vec::new();
        let mut rendered = 0;

        for tag in &tags {
            let mut model = TemplateModel::new();
            model.set(TAG, json!(tag));
            match renderer.render_artifact("tag", &tag_uri(config, tag), model) {
                Ok(()) => rendered += 1,
                Err(err) => errors.push(error_chain(&err)),
            }
        }

        if config.tags.index {
            let file = format!("{}/index{}", config.tags.path, config.build.output_extension);
            if let Err(err) = renderer.render_artifact("tagsindex", &file, TemplateModel::new()) {
                errors.push(error_chain(&err));
            }
        }

        if errors.is_empty() {
            Ok(rendered)
        } else {
            Err(RenderError::Aggregate {
                attempted: tags.len(),
                errors,
            })
        }
    }
}
