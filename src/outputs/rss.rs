//! RSS 2.0 feed rendering.
//!
//! The channel declares the Atom namespace (for the `self` link) and the
//! Media RSS namespace (for per-item images):
//!
//! ```text
//! <rss version="2.0" xmlns:atom=… xmlns:media=…>
//!   <channel>
//!     <title/> <link/> <description/> <language/> <lastBuildDate/>
//!     <atom:link href=… rel="self" type="application/rss+xml"/>
//!     <item>
//!       <title/> <link/> <guid isPermaLink="true"/> <pubDate/>
//!       <author/>?  <description/>  <media:content url=… medium="image"/>?
//!     </item>
//!   </channel>
//! </rss>
//! ```

use crate::config::SiteConfig;
use crate::models::PostItem;
use crate::scrapers::dates::format_rfc2822;
use crate::utils::ensure_parent_dir;
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error;
use std::io::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";

/// HTML body for an item's `<description>`.
///
/// An image block comes first when the item has an image. Then the full
/// `content_html` verbatim if present, otherwise the summary as one
/// paragraph. The result is raw HTML; the XML writer escapes it.
pub fn build_item_description(item: &PostItem) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(image) = item.image_url.as_deref().filter(|u| !u.is_empty()) {
        parts.push(format!(
            r#"<p><img src="{}" alt="{}" /></p>"#,
            html_escape::encode_double_quoted_attribute(image),
            html_escape::encode_double_quoted_attribute(&item.title),
        ));
    }
    match item.content_html.as_deref().filter(|c| !c.is_empty()) {
        Some(content) => parts.push(content.to_string()),
        None if !item.summary.is_empty() => {
            parts.push(format!("<p>{}</p>", html_escape::encode_text(&item.summary)));
        }
        None => {}
    }
    parts.concat()
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), Box<dyn Error>> {
    if text.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(name)))?;
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(&strip_control_chars(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Drop C0 control characters XML 1.0 cannot carry (tab, LF, CR are kept).
fn strip_control_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
        .collect()
}

/// Render the full feed document.
pub fn render_rss(
    config: &SiteConfig,
    items: &[PostItem],
    feed_url: &str,
    build_time: DateTime<Utc>,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", ATOM_NS));
    rss.push_attribute(("xmlns:media", MEDIA_NS));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut writer, "title", &config.feed_title)?;
    write_text_element(&mut writer, "link", &config.category_url)?;
    write_text_element(&mut writer, "description", &config.feed_description)?;
    write_text_element(&mut writer, "language", "en-us")?;
    write_text_element(&mut writer, "lastBuildDate", &format_rfc2822(&build_time))?;

    let mut atom_link = BytesStart::new("atom:link");
    atom_link.push_attribute(("href", feed_url));
    atom_link.push_attribute(("rel", "self"));
    atom_link.push_attribute(("type", "application/rss+xml"));
    writer.write_event(Event::Empty(atom_link))?;

    for item in items {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &item.title)?;
        write_text_element(&mut writer, "link", &item.link)?;

        writer.write_event(Event::Start(
            BytesStart::new("guid").with_attributes([("isPermaLink", "true")]),
        ))?;
        writer.write_event(Event::Text(BytesText::new(&item.guid)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;

        write_text_element(&mut writer, "pubDate", &item.pub_date)?;
        if !item.author.is_empty() {
            write_text_element(&mut writer, "author", &item.author)?;
        }
        write_text_element(&mut writer, "description", &build_item_description(item))?;
        if let Some(image) = item.image_url.as_deref().filter(|u| !u.is_empty()) {
            let media = BytesStart::new("media:content")
                .with_attributes([("url", image), ("medium", "image")]);
            writer.write_event(Event::Empty(media))?;
        }
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// Render and write the feed to `output_path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %output_path.display(), items = items.len()))]
pub async fn write_rss(
    output_path: &Path,
    config: &SiteConfig,
    items: &[PostItem],
    feed_url: &str,
) -> Result<(), Box<dyn Error>> {
    let xml = render_rss(config, items, feed_url, Utc::now())?;
    ensure_parent_dir(output_path).await?;
    fs::write(output_path, xml).await?;
    info!(%feed_url, "Wrote RSS feed");
    Ok(())
}
