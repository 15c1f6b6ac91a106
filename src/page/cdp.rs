use async_trait::async_trait;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;

use super::{Fragment, FragmentLayout, HostPage, NodeId};
use crate::error::{Result, YtotError};
use crate::ui::UiState;

/// Permissions granted to embedded players
const FRAME_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture; fullscreen";

/// Element id of the control surface
const CONTROLS_ID: &str = "ytot-controls";

/// Shared helpers evaluated before every snippet. Elements get a stable
/// `data-ytot-node` attribute the first time they are handed out.
const PRELUDE: &str = r#"
const __tag = (el) => {
    if (!el) return null;
    if (!el.dataset.ytotNode) {
        window.__ytotSeq = (window.__ytotSeq || 0) + 1;
        el.dataset.ytotNode = String(window.__ytotSeq);
    }
    return Number(el.dataset.ytotNode);
};
const __node = (id) => document.querySelector(`[data-ytot-node="${id}"]`);
"#;

/// A live Chromium tab driven over CDP
#[derive(Clone)]
pub struct CdpPage {
    page: Page,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Run `body` as a function body and decode its return value. The value
    /// travels as JSON text so `null` and `undefined` decode as `None`.
    async fn eval<T: DeserializeOwned>(&self, body: &str) -> Result<T> {
        let expression = format!(
            "(() => {{ {PRELUDE} const __r = (() => {{ {body} }})(); return JSON.stringify(__r === undefined ? null : __r); }})()"
        );

        let raw: String = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| YtotError::Page(format!("evaluate failed: {}", e)))?
            .into_value()
            .map_err(|e| YtotError::Page(format!("unexpected evaluation result: {}", e)))?;

        Ok(serde_json::from_str(&raw)?)
    }
}

/// Snippets return `false` when the node they were handed is gone
fn found(present: bool, node: NodeId) -> Result<()> {
    if present {
        Ok(())
    } else {
        Err(YtotError::Page(format!("node {} is no longer in the page", node)))
    }
}

/// Quote a Rust string as a JavaScript string literal
fn js_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[async_trait]
impl HostPage for CdpPage {
    async fn current_url(&self) -> Result<String> {
        self.eval("return location.href;").await
    }

    async fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        self.eval(&format!(
            "return __tag(document.querySelector({}));",
            js_str(selector)
        ))
        .await
    }

    async fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        self.eval(&format!(
            "const el = __node({node}); return el ? __tag(el.closest({})) : null;",
            js_str(selector)
        ))
        .await
    }

    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.eval(&format!(
            "const el = __node({node}); return el ? __tag(el.parentElement) : null;"
        ))
        .await
    }

    async fn text(&self, node: NodeId) -> Result<Option<String>> {
        self.eval(&format!(
            "const el = __node({node}); return el ? el.textContent : null;"
        ))
        .await
    }

    async fn mount(&self, parent: NodeId, fragment: &Fragment) -> Result<NodeId> {
        let placement = match fragment.layout {
            FragmentLayout::Overlay => {
                "host.style.position = 'relative'; \
                 wrapper.style.cssText = 'position:absolute;inset:0;z-index:10;background:#000;';"
            }
            FragmentLayout::FloatingPanel => {
                "wrapper.style.cssText = 'position:fixed;right:20px;top:80px;width:340px;height:500px;\
                 z-index:9999;border-radius:8px;overflow:hidden;box-shadow:0 4px 20px rgba(0,0,0,0.5);';"
            }
        };

        let mounted: Option<NodeId> = self
            .eval(&format!(
                r#"
                const host = __node({parent});
                if (!host) return null;
                document.getElementById({wrapper_id})?.remove();
                const wrapper = document.createElement('div');
                wrapper.id = {wrapper_id};
                const frame = document.createElement('iframe');
                frame.id = {frame_id};
                frame.title = {title};
                frame.src = {src};
                frame.allow = {allow};
                frame.setAttribute('allowfullscreen', 'true');
                frame.style.cssText = 'width:100%;height:100%;border:0;';
                {placement}
                wrapper.appendChild(frame);
                host.appendChild(wrapper);
                return __tag(wrapper);
                "#,
                wrapper_id = js_str(&fragment.wrapper_id),
                frame_id = js_str(&fragment.frame_id),
                title = js_str(&fragment.title),
                src = js_str(&fragment.src),
                allow = js_str(FRAME_ALLOW),
            ))
            .await?;

        mounted.ok_or_else(|| YtotError::Page(format!("mount node {} disappeared", parent)))
    }

    async fn unmount(&self, node: NodeId) -> Result<()> {
        let _: bool = self
            .eval(&format!(
                "const el = __node({node}); if (el) el.remove(); return true;"
            ))
            .await?;
        Ok(())
    }

    async fn hide_native(&self, node: NodeId) -> Result<()> {
        let hidden: bool = self
            .eval(&format!(
                r#"
                const el = __node({node});
                if (!el) return false;
                el.dataset.ytotVisibility = el.style.visibility;
                el.style.visibility = 'hidden';
                if (el instanceof HTMLMediaElement) {{
                    el.pause();
                    el.muted = true;
                }}
                return true;
                "#
            ))
            .await?;
        found(hidden, node)
    }

    async fn restore_native(&self, node: NodeId) -> Result<()> {
        let _: bool = self
            .eval(&format!(
                r#"
                const el = __node({node});
                if (!el) return false;
                el.style.visibility = el.dataset.ytotVisibility || '';
                delete el.dataset.ytotVisibility;
                if (el instanceof HTMLMediaElement) {{
                    el.muted = false;
                    el.play().catch(() => {{}});
                }}
                return true;
                "#
            ))
            .await?;
        Ok(())
    }

    async fn post_message(&self, frame_id: &str, payload: &str) -> Result<()> {
        let delivered: bool = self
            .eval(&format!(
                r#"
                const frame = document.getElementById({frame});
                if (!frame || !frame.contentWindow) return false;
                frame.contentWindow.postMessage({payload}, '*');
                return true;
                "#,
                frame = js_str(frame_id),
                payload = js_str(payload),
            ))
            .await?;

        if delivered {
            Ok(())
        } else {
            Err(YtotError::Page(format!("frame {} is gone", frame_id)))
        }
    }

    async fn install_controls(&self, anchor: NodeId) -> Result<()> {
        let installed: bool = self
            .eval(&format!(
                r#"
                if (document.getElementById({id})) return true;
                const host = __node({anchor});
                if (!host) return false;
                const controls = document.createElement('div');
                controls.id = {id};
                controls.style.cssText = 'display:inline-flex;gap:6px;align-items:center;font-size:12px;';
                controls.innerHTML = '<span class="ytot-label"></span><span class="ytot-status"></span>';
                host.appendChild(controls);
                return true;
                "#,
                id = js_str(CONTROLS_ID),
            ))
            .await?;
        found(installed, anchor)
    }

    async fn render(&self, ui: &UiState) -> Result<()> {
        let state = serde_json::to_string(ui)?;
        let _: bool = self
            .eval(&format!(
                r#"
                const controls = document.getElementById({id});
                if (!controls) return false;
                const ui = {state};
                controls.classList.toggle('active', ui.active);
                controls.querySelector('.ytot-label').textContent = ui.active ? 'Live' : ui.foreign_name;
                const status = controls.querySelector('.ytot-status');
                status.textContent = ui.status.message;
                status.className = 'ytot-status' + (ui.status.kind === 'none' ? '' : ' ytot-status-' + ui.status.kind);
                return true;
                "#,
                id = js_str(CONTROLS_ID),
            ))
            .await?;
        Ok(())
    }
}
