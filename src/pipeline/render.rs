//! Slide rendering: drive the deck inside a headless browser and print each
//! slide to a single PDF page.
//!
//! [`SlideRenderer`] is the rendering context the pipeline talks to. It
//! exposes the deck's global "show slide N" mechanism as an explicit
//! [`SlideRenderer::display_slide`] command that does not return until the
//! transition has settled, so the caller never prints a half-animated slide.
//!
//! [`ChromeRenderer`] implements it on top of Chromium via the DevTools
//! protocol. Tests substitute their own implementation.
//!
//! ## Settling
//!
//! Readiness is bounded in both modes. [`SettleMode::Fixed`] sleeps the whole
//! settle duration. [`SettleMode::Readiness`] races the browser's own signals
//! (`document.fonts.ready`, pending `<img>` loads, running animations'
//! `finished` promises) against a timer of the same duration, so decks with
//! no animation print immediately and decks with infinite animations still
//! print on time.

use crate::config::{ExportConfig, PageSize, SettleMode};
use crate::error::ExportError;
use crate::pipeline::input::DeckSource;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A rendering context holding one loaded slide-show document.
///
/// Calls are strictly sequential: every future completes before the
/// pipeline issues the next command.
pub trait SlideRenderer: Send {
    /// Load the deck and wait for its assets to settle.
    fn open(&mut self, deck: &DeckSource) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Count the slides in the loaded deck.
    fn slide_count(&mut self) -> impl Future<Output = Result<usize, ExportError>> + Send;

    /// The loaded document's title, if it has one.
    fn title(&mut self) -> impl Future<Output = Result<Option<String>, ExportError>> + Send;

    /// Show 1-indexed `slide` and wait for its transition to settle.
    fn display_slide(&mut self, slide: usize)
        -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Print the currently displayed slide as a one-page PDF.
    ///
    /// `slide` is only used to attribute errors.
    fn render_page(&mut self, slide: usize)
        -> impl Future<Output = Result<Vec<u8>, ExportError>> + Send;

    /// Release the rendering context.
    fn close(self) -> impl Future<Output = Result<(), ExportError>> + Send
    where
        Self: Sized;
}

/// The subset of [`ExportConfig`] the browser needs for the whole run.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub page_size: PageSize,
    pub load_settle_ms: u64,
    pub transition_settle_ms: u64,
    pub settle_mode: SettleMode,
    pub slide_selector: String,
    pub show_slide_fn: String,
    pub current_slide_var: Option<String>,
}

impl From<&ExportConfig> for RenderSettings {
    fn from(c: &ExportConfig) -> Self {
        Self {
            page_size: c.page_size,
            load_settle_ms: c.load_settle_ms,
            transition_settle_ms: c.transition_settle_ms,
            settle_mode: c.settle_mode,
            slide_selector: c.slide_selector.clone(),
            show_slide_fn: c.show_slide_fn.clone(),
            current_slide_var: c.current_slide_var.clone(),
        }
    }
}

/// Headless Chromium driven over the DevTools protocol.
pub struct ChromeRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    url: String,
    settings: RenderSettings,
}

impl ChromeRenderer {
    /// Start a headless browser whose viewport matches the page size.
    pub async fn launch(config: &ExportConfig) -> Result<Self, ExportError> {
        let settings = RenderSettings::from(config);
        let size = settings.page_size;

        let mut builder = BrowserConfig::builder()
            .window_size(size.width_px, size.height_px)
            .viewport(Viewport {
                width: size.width_px,
                height: size.height_px,
                ..Viewport::default()
            });
        if let Some(ref exe) = config.chrome_executable {
            builder = builder.chrome_executable(exe);
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        let browser_config = builder.build().map_err(ExportError::BrowserLaunchFailed)?;

        let (browser, mut events) = Browser::launch(browser_config)
            .await
            .map_err(|e| ExportError::BrowserLaunchFailed(e.to_string()))?;

        // The protocol handler must be polled for any command to complete.
        let handler = tokio::spawn(async move {
            let skipped = drain_events(&mut events).await;
            debug!("Browser connection closed ({} unreadable messages)", skipped);
        });

        info!("Launched headless Chromium ({} viewport)", size);
        Ok(Self {
            browser,
            handler,
            page: None,
            url: String::new(),
            settings,
        })
    }
}

/// Poll the protocol event stream until it ends, returning how many items
/// were errors.
///
/// A message the pinned protocol cannot decode surfaces as an `Err` item
/// while the connection stays usable, so errors are logged and skipped.
async fn drain_events<S, T, E>(events: &mut S) -> usize
where
    S: futures::Stream<Item = Result<T, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut skipped = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            skipped += 1;
            warn!("Ignoring unreadable browser message: {}", e);
        }
    }
    skipped
}

fn opened(page: &Option<Page>) -> Result<&Page, String> {
    page.as_ref()
        .ok_or_else(|| "no deck has been opened".to_string())
}

/// Evaluate `js` in the page, awaiting promises, and deserialise the result.
async fn evaluate<T: DeserializeOwned>(page: &Page, js: String) -> Result<T, String> {
    let params = EvaluateParams::builder()
        .expression(js)
        .await_promise(true)
        .return_by_value(true)
        .build()?;
    page.evaluate_expression(params)
        .await
        .map_err(|e| e.to_string())?
        .into_value::<T>()
        .map_err(|e| format!("unexpected script result: {e}"))
}

async fn settle(page: &Page, mode: SettleMode, ready_js: String, bound_ms: u64) -> Result<(), String> {
    match mode {
        SettleMode::Fixed => {
            tokio::time::sleep(Duration::from_millis(bound_ms)).await;
            Ok(())
        }
        SettleMode::Readiness => evaluate::<bool>(page, ready_js).await.map(|_| ()),
    }
}

impl SlideRenderer for ChromeRenderer {
    async fn open(&mut self, deck: &DeckSource) -> Result<(), ExportError> {
        let url = deck.url().to_string();
        let load_err = |detail: String| ExportError::AssetLoadFailed {
            url: url.clone(),
            detail,
        };

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| load_err(e.to_string()))?;
        page.goto(url.as_str())
            .await
            .map_err(|e| load_err(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| load_err(e.to_string()))?;

        let bound = self.settings.load_settle_ms;
        settle(&page, self.settings.settle_mode, load_ready_script(bound), bound)
            .await
            .map_err(load_err)?;

        info!("Loaded {}", url);
        self.page = Some(page);
        self.url = url;
        Ok(())
    }

    async fn slide_count(&mut self) -> Result<usize, ExportError> {
        let selector = &self.settings.slide_selector;
        let discovery_err = |detail: String| ExportError::SlideDiscoveryFailed {
            selector: selector.clone(),
            detail,
        };
        let page = opened(&self.page).map_err(discovery_err)?;
        evaluate::<usize>(page, count_script(selector))
            .await
            .map_err(discovery_err)
    }

    async fn title(&mut self) -> Result<Option<String>, ExportError> {
        let load_err = |detail: String| ExportError::AssetLoadFailed {
            url: self.url.clone(),
            detail,
        };
        let page = opened(&self.page).map_err(load_err)?;
        let title = evaluate::<String>(page, "document.title".to_string())
            .await
            .map_err(load_err)?;
        Ok(Some(title.trim().to_string()).filter(|t| !t.is_empty()))
    }

    async fn display_slide(&mut self, slide: usize) -> Result<(), ExportError> {
        let nav_err = |detail: String| ExportError::NavigationFailed { slide, detail };
        let settings = &self.settings;
        let page = opened(&self.page).map_err(nav_err)?;

        let js = navigate_script(
            &settings.show_slide_fn,
            settings.current_slide_var.as_deref(),
            slide,
        );
        let shown = evaluate::<bool>(page, js).await.map_err(nav_err)?;
        if !shown {
            return Err(nav_err(format!(
                "the deck does not define a global function '{}'",
                settings.show_slide_fn
            )));
        }

        let bound = settings.transition_settle_ms;
        settle(page, settings.settle_mode, transition_ready_script(bound), bound)
            .await
            .map_err(nav_err)?;
        debug!("Slide {} displayed", slide);
        Ok(())
    }

    async fn render_page(&mut self, slide: usize) -> Result<Vec<u8>, ExportError> {
        let render_err = |detail: String| ExportError::RenderFailed { slide, detail };
        let page = opened(&self.page).map_err(render_err)?;
        let pdf = page
            .pdf(print_params(self.settings.page_size))
            .await
            .map_err(|e| render_err(e.to_string()))?;
        if pdf.is_empty() {
            return Err(render_err("browser returned an empty PDF".into()));
        }
        Ok(pdf)
    }

    /// Shut the browser down and wait for the process to exit.
    async fn close(mut self) -> Result<(), ExportError> {
        self.page = None;
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| ExportError::Internal(format!("Failed to close browser: {e}")));
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

/// Print options: one page of exactly `size`, backgrounds on, no margins.
pub fn print_params(size: PageSize) -> PrintToPdfParams {
    let mut params = PrintToPdfParams::default();
    params.print_background = Some(true);
    params.paper_width = Some(size.width_in());
    params.paper_height = Some(size.height_in());
    params.margin_top = Some(0.0);
    params.margin_bottom = Some(0.0);
    params.margin_left = Some(0.0);
    params.margin_right = Some(0.0);
    params.prefer_css_page_size = Some(false);
    params.page_ranges = Some("1".to_string());
    params
}

// ── Scripts ──────────────────────────────────────────────────────────────

/// Quote `s` as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

pub(crate) fn count_script(selector: &str) -> String {
    format!("document.querySelectorAll({}).length", js_string(selector))
}

/// Assign the current-slide variable (if any) and call the show function.
/// Evaluates to `false` when the function is missing.
pub(crate) fn navigate_script(show_fn: &str, current_var: Option<&str>, slide: usize) -> String {
    let call = match current_var {
        Some(var) => format!("{var} = {slide};\n  {show_fn}({var});"),
        None => format!("{show_fn}({slide});"),
    };
    format!(
        "(() => {{\n  if (typeof {show_fn} !== 'function') {{ return false; }}\n  {call}\n  return true;\n}})()"
    )
}

/// Resolve once fonts and pending images have loaded, or after `bound_ms`.
pub(crate) fn load_ready_script(bound_ms: u64) -> String {
    format!(
        r#"(async () => {{
  const bound = new Promise(resolve => setTimeout(resolve, {bound_ms}));
  const images = Array.from(document.images)
    .filter(img => !img.complete)
    .map(img => new Promise(resolve => {{
      img.addEventListener('load', resolve, {{ once: true }});
      img.addEventListener('error', resolve, {{ once: true }});
    }}));
  const fonts = document.fonts ? document.fonts.ready : Promise.resolve();
  await Promise.race([Promise.all([fonts, ...images]), bound]);
  return true;
}})()"#
    )
}

/// Resolve once every running animation or transition has finished, or
/// after `bound_ms`. Two frames pass first so style changes made by the
/// show-slide call have started their transitions.
pub(crate) fn transition_ready_script(bound_ms: u64) -> String {
    format!(
        r#"(async () => {{
  const bound = new Promise(resolve => setTimeout(resolve, {bound_ms}));
  const settled = (async () => {{
    await new Promise(resolve => requestAnimationFrame(() => requestAnimationFrame(resolve)));
    const running = document.getAnimations ? document.getAnimations() : [];
    await Promise.all(running.map(a => a.finished.catch(() => null)));
  }})();
  await Promise.race([settled, bound]);
  return true;
}})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handler_errors_do_not_stop_the_event_loop() {
        let items: Vec<Result<u32, String>> = vec![
            Ok(1),
            Err("unknown event Page.fooBar".into()),
            Ok(2),
            Err("bad frame".into()),
            Ok(3),
        ];
        let mut events = futures::stream::iter(items);

        assert_eq!(drain_events(&mut events).await, 2);
        assert!(events.next().await.is_none(), "stream fully consumed");
    }

    #[test]
    fn print_params_match_page_size() {
        let params = print_params(PageSize::new(1920, 1080));
        assert_eq!(params.paper_width, Some(20.0));
        assert_eq!(params.paper_height, Some(11.25));
        assert_eq!(params.print_background, Some(true));
        assert_eq!(params.margin_top, Some(0.0));
        assert_eq!(params.prefer_css_page_size, Some(false));
        assert_eq!(params.page_ranges.as_deref(), Some("1"));
    }

    #[test]
    fn selector_is_quoted() {
        assert_eq!(
            count_script(".slide"),
            r#"document.querySelectorAll(".slide").length"#
        );
        let js = count_script(r#"section[data-kind="slide"]"#);
        assert!(js.contains(r#""section[data-kind=\"slide\"]""#), "got {js}");
    }

    #[test]
    fn navigation_sets_current_slide_then_shows_it() {
        let js = navigate_script("showSlide", Some("currentSlide"), 4);
        assert!(js.contains("typeof showSlide !== 'function'"));
        assert!(js.contains("currentSlide = 4;"));
        assert!(js.contains("showSlide(currentSlide);"));
        assert!(js.find("currentSlide = 4").unwrap() < js.find("showSlide(currentSlide)").unwrap());
    }

    #[test]
    fn navigation_without_state_variable() {
        let js = navigate_script("goTo", None, 2);
        assert!(js.contains("goTo(2);"));
        assert!(!js.contains(" = 2"));
    }

    #[test]
    fn readiness_scripts_are_bounded() {
        assert!(load_ready_script(2000).contains("setTimeout(resolve, 2000)"));
        assert!(load_ready_script(2000).contains("document.fonts.ready"));
        let js = transition_ready_script(3000);
        assert!(js.contains("setTimeout(resolve, 3000)"));
        assert!(js.contains("getAnimations"));
        assert!(js.contains("Promise.race"));
    }

    #[test]
    fn settings_follow_config() {
        let config = ExportConfig::builder()
            .page_size(PageSize::new(1280, 720))
            .settle_mode(SettleMode::Fixed)
            .build()
            .unwrap();
        let settings = RenderSettings::from(&config);
        assert_eq!(settings.page_size, PageSize::new(1280, 720));
        assert_eq!(settings.settle_mode, SettleMode::Fixed);
        assert_eq!(settings.show_slide_fn, "showSlide");
    }
}
