//! Server-rendered admin pages
//!
//! Tables are rendered from the store; mutations go through the JSON API
//! with small inline scripts.

use axum::{extract::State, response::Html};
use std::fmt::Write;
use std::sync::Arc;

use super::{ApiResult, AppState};
use crate::model::CoreValue;
use crate::render::presets::{self, CLASSIC_STYLE};
use crate::render::sanitize::escape_html;

const STYLE: &str = r#"
  body { font-family: system-ui, sans-serif; margin: 0; background: #fafafa; color: #222; }
  nav { background: #111; padding: 12px 24px; }
  nav a { color: #f7c359; margin-right: 18px; text-decoration: none; }
  main { padding: 24px; max-width: 1100px; }
  table { border-collapse: collapse; width: 100%; background: #fff; }
  th, td { border-bottom: 1px solid #ddd; padding: 8px; text-align: left; vertical-align: top; }
  .muted { color: #777; }
  .cards { display: flex; gap: 16px; flex-wrap: wrap; }
  .card { background: #fff; border: 1px solid #ddd; border-radius: 8px; padding: 16px; min-width: 140px; }
  .card b { font-size: 28px; display: block; }
  form { background: #fff; border: 1px solid #ddd; padding: 16px; margin: 16px 0; }
  label { display: block; margin-top: 8px; }
  input, textarea, select { width: 100%; padding: 6px; box-sizing: border-box; }
  button { margin-top: 10px; padding: 6px 14px; cursor: pointer; }
  #out img { max-width: 432px; border: 1px solid #ddd; margin-top: 16px; }
"#;

const SCRIPT: &str = r#"
async function api(method, url, body) {
  const res = await fetch(url, {
    method,
    headers: { 'Content-Type': 'application/json' },
    body: body === undefined ? undefined : JSON.stringify(body),
  });
  const data = res.headers.get('content-type')?.includes('json') ? await res.json() : await res.blob();
  if (!res.ok) { alert(data.error || res.statusText); throw data; }
  return data;
}
function showImage(blob) {
  const out = document.getElementById('out');
  out.innerHTML = '';
  const img = document.createElement('img');
  img.src = URL.createObjectURL(blob);
  out.appendChild(img);
}
function formJson(form) {
  const data = {};
  for (const [k, v] of new FormData(form).entries()) { if (v !== '') data[k] = v; }
  return data;
}
"#;

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>{title} · anchorpost</title>
  <style>{STYLE}</style>
  <script>{SCRIPT}</script>
</head>
<body>
  <nav>
    <a href="/admin">Dashboard</a>
    <a href="/admin/values">Values</a>
    <a href="/admin/quotes">Quotes</a>
    <a href="/admin/posts">Posts</a>
    <a href="/admin/image-gen">Image generator</a>
    <a href="/admin/post-generator">Post generator</a>
  </nav>
  <main>
    <h1>{title}</h1>
    {body}
  </main>
</body>
</html>"#,
        title = escape_html(title),
    ))
}

fn archive_button(kind: &str, id: &str) -> String {
    format!(
        r#"<button onclick="api('PATCH', '/api/admin/{kind}/{id}', {{action: 'archive'}}).then(() => location.reload())">Archive</button>"#,
        kind = kind,
        id = escape_html(id),
    )
}

fn delete_button(kind: &str, id: &str) -> String {
    format!(
        r#"<button onclick="confirm('Delete permanently? Links and posts go with it.') && api('DELETE', '/api/admin/{kind}/{id}').then(() => location.reload())">Delete</button>"#,
        kind = kind,
        id = escape_html(id),
    )
}

/// `<select>` over active core values
fn core_value_select(name: &str, core_values: &[CoreValue], required: bool) -> String {
    let mut select = format!(
        r#"<select name="{}"{}><option value="">Select a core value</option>"#,
        name,
        if required { " required" } else { "" }
    );
    for cv in core_values {
        let _ = write!(
            select,
            r#"<option value="{}">{}</option>"#,
            escape_html(&cv.id),
            escape_html(&cv.value)
        );
    }
    select.push_str("</select>");
    select
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let stats = {
        let store = state.store.lock().await;
        store.stats().map_err(|e| state.fail(e, "Failed to fetch stats"))?
    };

    let mut body = String::from(r#"<div class="cards">"#);
    for (label, count) in [
        ("Core values", stats.core_values),
        ("Supporting values", stats.supporting_values),
        ("Quotes", stats.quotes),
        ("Authors", stats.authors),
        ("Posts", stats.posts),
        ("Published", stats.published_posts),
    ] {
        let _ = write!(body, r#"<div class="card"><b>{}</b>{}</div>"#, count, label);
    }
    body.push_str("</div>");
    body.push_str(
        r#"
    <p>
      <button onclick="api('POST', '/api/admin/seed').then(r => { alert(r.message); location.reload(); })">Seed sample data</button>
      <button onclick="confirm('Replace all data with the Notion export?') && api('POST', '/api/admin/seed-notion').then(r => { alert(r.message); location.reload(); })">Import Notion CSV</button>
      <a href="/api/admin/analyze-data">Quality report</a>
    </p>"#,
    );
    Ok(layout("Dashboard", &body))
}

pub async fn values(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let (core_values, supporting_values) = {
        let store = state.store.lock().await;
        let core = store
            .list_core_values()
            .map_err(|e| state.fail(e, "Failed to fetch core values"))?;
        let supporting = store
            .list_supporting_values()
            .map_err(|e| state.fail(e, "Failed to fetch supporting values"))?;
        (core, supporting)
    };

    let mut body = String::from(
        r#"<form onsubmit="event.preventDefault(); api('POST', '/api/admin/core-values', formJson(this)).then(() => location.reload())">
      <label>New core value <input name="value" required></label>
      <label>Description <input name="description"></label>
      <button>Add core value</button>
    </form>"#,
    );
    let _ = write!(
        body,
        r#"<form onsubmit="event.preventDefault(); api('POST', '/api/admin/supporting-values', formJson(this)).then(() => location.reload())">
      <label>New supporting value <input name="value" required></label>
      <label>Description <input name="description"></label>
      <label>Core value {}</label>
      <button>Add supporting value</button>
    </form>"#,
        core_value_select("coreValueId", &core_values, true)
    );

    body.push_str("<h2>Core values</h2><table><tr><th>Core value</th><th>Supporting values</th><th></th></tr>");
    for cv in &core_values {
        let linked: Vec<String> = supporting_values
            .iter()
            .filter(|sv| sv.core_value_ids.contains(&cv.id))
            .map(|sv| escape_html(&sv.supporting_value.value))
            .collect();
        let _ = write!(
            body,
            r#"<tr><td><b>{}</b><div class="muted">{}</div></td><td>{}</td><td>{} {}</td></tr>"#,
            escape_html(&cv.value),
            escape_html(cv.description.as_deref().unwrap_or("")),
            linked.join(", "),
            archive_button("core-values", &cv.id),
            delete_button("core-values", &cv.id),
        );
    }
    body.push_str("</table>");

    body.push_str("<h2>Supporting values</h2><table><tr><th>Supporting value</th><th>Core values</th><th></th></tr>");
    for sv in &supporting_values {
        let parents: Vec<String> = core_values
            .iter()
            .filter(|cv| sv.core_value_ids.contains(&cv.id))
            .map(|cv| escape_html(&cv.value))
            .collect();
        let _ = write!(
            body,
            r#"<tr><td><b>{}</b><div class="muted">{}</div></td><td>{}</td><td>{} {}</td></tr>"#,
            escape_html(&sv.supporting_value.value),
            escape_html(sv.supporting_value.description.as_deref().unwrap_or("")),
            parents.join(", "),
            archive_button("supporting-values", &sv.supporting_value.id),
            delete_button("supporting-values", &sv.supporting_value.id),
        );
    }
    body.push_str("</table>");
    Ok(layout("Values", &body))
}

pub async fn quotes(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let (core_values, quotes) = {
        let store = state.store.lock().await;
        let core = store
            .list_core_values()
            .map_err(|e| state.fail(e, "Failed to fetch core values"))?;
        let quotes = store.list_quotes().map_err(|e| state.fail(e, "Failed to fetch quotes"))?;
        (core, quotes)
    };

    let mut body = format!(
        r#"<form onsubmit="event.preventDefault(); api('POST', '/api/admin/quotes', formJson(this)).then(() => location.reload())">
      <label>Quote <textarea name="text" required></textarea></label>
      <label>Author <input name="authorName"></label>
      <label>Core value {}</label>
      <button>Add</button>
    </form>
    <table><tr><th>Quote</th><th>Author</th><th>Core values</th><th>Category</th><th></th></tr>"#,
        core_value_select("coreValueId", &core_values, false)
    );
    for quote in &quotes {
        let linked: Vec<String> = core_values
            .iter()
            .filter(|cv| quote.core_value_ids.contains(&cv.id))
            .map(|cv| escape_html(&cv.value))
            .collect();
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{} {}</td></tr>",
            escape_html(&quote.quote.text),
            escape_html(quote.author_name()),
            linked.join(", "),
            escape_html(quote.quote.category.as_deref().unwrap_or("")),
            archive_button("quotes", &quote.quote.id),
            delete_button("quotes", &quote.quote.id),
        );
    }
    body.push_str("</table>");
    Ok(layout("Quotes", &body))
}

pub async fn posts(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let posts = {
        let store = state.store.lock().await;
        store
            .list_quote_posts()
            .map_err(|e| state.fail(e, "Failed to fetch posts"))?
    };

    let mut body = String::from(
        r#"<div id="out"></div>
    <table><tr><th>Created</th><th>Post</th><th>Status</th><th></th></tr>"#,
    );
    for post in &posts {
        let id = escape_html(&post.post.id);
        let status = match post.post.published_at {
            Some(at) => format!("Published {}", at.format("%Y-%m-%d %H:%M")),
            None if post.post.is_published => "Published".to_string(),
            None => "Draft".to_string(),
        };
        let _ = write!(
            body,
            r#"<tr><td>{created}</td><td><b>{cv}</b> / {sv}<div>&quot;{quote}&quot; <span class="muted">{author}</span></div></td><td>{status}</td>
<td><button onclick="api('POST', '/api/generate-post-image', {{quotePostId: '{id}'}}).then(showImage)">Image</button>
<button onclick="api('PATCH', '/api/admin/posts/{id}', {{isPublished: true}}).then(() => location.reload())">Mark published</button></td></tr>"#,
            created = post.post.created_at.format("%Y-%m-%d %H:%M"),
            cv = escape_html(&post.core_value.value),
            sv = escape_html(&post.supporting_value.value),
            quote = escape_html(&post.quote.quote.text),
            author = escape_html(post.quote.author_name()),
            status = status,
            id = id,
        );
    }
    body.push_str("</table>");
    Ok(layout("Posts", &body))
}

pub async fn image_gen() -> Html<String> {
    let mut options = format!(r#"<option value="{0}">Classic ({0})</option>"#, CLASSIC_STYLE);
    for preset in presets::active_presets() {
        let _ = write!(
            options,
            r#"<option value="{}">{}</option>"#,
            escape_html(preset.id),
            escape_html(preset.name)
        );
    }

    let body = format!(
        r#"<form onsubmit="event.preventDefault(); api('POST', '/api/generate-image', formJson(this)).then(showImage)">
      <label>Core value <input name="coreValue" maxlength="50" required></label>
      <label>Supporting value <input name="supportingValue" maxlength="60" required></label>
      <label>Quote <textarea name="quote" minlength="10" maxlength="200" required></textarea></label>
      <label>Author <input name="author" maxlength="30"></label>
      <label>Style <select name="style">{options}</select></label>
      <button>Generate</button>
    </form>
    <form onsubmit="event.preventDefault(); api('POST', '/api/generate-text-image', formJson(this)).then(showImage)">
      <label>Text card (<code>**highlight**</code>, <code>*italic*</code>) <textarea name="text" required></textarea></label>
      <button>Generate text card</button>
    </form>
    <div id="out"></div>"#,
        options = options,
    );
    layout("Image generator", &body)
}

pub async fn post_generator() -> Html<String> {
    let body = r#"<p>Pick a random core value, a supporting value linked to it and a quote linked to it.</p>
    <button id="generate">Generate post</button>
    <pre id="preview" class="muted"></pre>
    <div id="out"></div>
    <script>
      document.getElementById('generate').onclick = async () => {
        const result = await api('POST', '/api/generate-random-post');
        const p = result.preview;
        document.getElementById('preview').textContent =
          `${p.coreValue} / ${p.supportingValue}\n"${p.quote}"${p.author ? ' - ' + p.author : ''}`;
        showImage(await api('POST', '/api/generate-post-image', { quotePostId: result.quotePost.id }));
      };
    </script>"#;
    layout("Post generator", body)
}
