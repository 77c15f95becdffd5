//! Browser host: canvas drawing, frame loop, resize and visibility wiring,
//! and the embed feed loader.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use js_sys::{Function, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlScriptElement, VisibilityState, Window};

use crate::animator::GlitchAnimator;
use crate::canvas::{Canvas, Surface};
use crate::config::GlitchConfig;
use crate::embed::{EmbedConfig, EmbedLoader, ScriptHost};
use crate::error::EmbedError;
use crate::grid::{Size, Viewport};
use crate::palette::Rgb;
use crate::schedule::{FrameHandle, FrameScheduler, Visibility};
use crate::vignette::{CANVAS_CLASS, Vignette};

fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

fn now(window: &Window) -> Duration {
    let ms = window
        .performance()
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now);
    millis(ms)
}

fn millis(ms: f64) -> Duration {
    Duration::from_secs_f64(ms.max(0.0) / 1000.0)
}

fn measure(window: &Window, container: &Element) -> Viewport {
    let rect = container.get_bounding_client_rect();
    let dim = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);

    Viewport {
        container: Size::new(rect.width(), rect.height()),
        window: Size::new(dim(window.inner_width()), dim(window.inner_height())),
        device_pixel_ratio: window.device_pixel_ratio(),
    }
}

/// [`Canvas`] backed by a `<canvas>` element's 2D context.
pub struct ContextCanvas {
    element: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl Canvas for ContextCanvas {
    fn resize(&mut self, surface: &Surface) {
        let (width, height) = surface.backing_size();
        // Setting the size also resets transform, font and baseline.
        self.element.set_width(width);
        self.element.set_height(height);

        let style = self.element.style();
        for (property, value) in [("width", surface.css.width), ("height", surface.css.height)] {
            if let Err(err) = style.set_property(property, &format!("{value}px")) {
                warn(&format!("glitch background: setting canvas {property} failed: {}", describe(&err)));
            }
        }

        let ratio = surface.device_pixel_ratio;
        if let Err(err) = self.context.set_transform(ratio, 0.0, 0.0, ratio, 0.0, 0.0) {
            warn(&format!("glitch background: set_transform failed: {}", describe(&err)));
        }
        self.context.set_text_baseline("top");
    }

    fn clear(&mut self, width: f64, height: f64) {
        self.context.clear_rect(0.0, 0.0, width, height);
    }

    fn set_font(&mut self, font: &str) {
        self.context.set_font(font);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.context.set_global_alpha(alpha);
    }

    fn fill_glyph(&mut self, glyph: char, x: f64, y: f64, color: Rgb) {
        let mut utf8 = [0u8; 4];
        self.context.set_fill_style_str(&color.css());
        if let Err(err) = self.context.fill_text(glyph.encode_utf8(&mut utf8), x, y) {
            warn(&format!("glitch background: fillText failed: {}", describe(&err)));
        }
    }
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

struct RafScheduler<'a> {
    window: &'a Window,
    callback: &'a Closure<dyn FnMut(f64)>,
}

impl FrameScheduler for RafScheduler<'_> {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        match self
            .window
            .request_animation_frame(self.callback.as_ref().unchecked_ref())
        {
            Ok(id) => Some(FrameHandle(id)),
            Err(err) => {
                warn(&format!("glitch background: requestAnimationFrame failed: {}", describe(&err)));
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Err(err) = self.window.cancel_animation_frame(handle.0) {
            warn(&format!("glitch background: cancelAnimationFrame failed: {}", describe(&err)));
        }
    }
}

struct Background {
    animator: GlitchAnimator<ContextCanvas>,
    resize_timeout: Option<i32>,
}

/// Replace the contents of the element matching `selector` with the glitch
/// background. `options` is a JSON [`GlitchConfig`]; invalid options fall
/// back to the defaults. A missing container or 2D context leaves the page
/// untouched.
#[wasm_bindgen(js_name = mountGlitchBackground)]
pub fn mount_glitch_background(selector: &str, options: Option<String>) {
    if let Err(err) = try_mount_background(selector, options.as_deref()) {
        warn(&format!("glitch background disabled: {}", describe(&err)));
    }
}

fn load_options(options: Option<&str>) -> GlitchConfig {
    match options.map(GlitchConfig::from_json_str) {
        None => GlitchConfig::default(),
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            warn(&format!("glitch background: {err}, using defaults"));
            GlitchConfig::default()
        }
    }
}

fn try_mount_background(selector: &str, options: Option<&str>) -> Result<(), JsValue> {
    let Some(window) = web_sys::window() else {
        return Ok(());
    };
    let Some(document) = window.document() else {
        return Ok(());
    };
    let Some(container) = document.query_selector(selector)? else {
        return Ok(());
    };

    let config = load_options(options);

    container.set_inner_html("");
    let element: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    element.set_class_name(CANVAS_CLASS);
    container.append_child(&element)?;

    for class in Vignette::from_config(&config).overlay_classes() {
        let layer = document.create_element("div")?;
        layer.set_class_name(class);
        container.append_child(&layer)?;
    }

    let Some(context) = element.get_context("2d")? else {
        return Ok(());
    };
    let context: CanvasRenderingContext2d = context.dyn_into()?;

    let debounce_ms = config.resize_debounce_ms.min(i32::MAX as u64) as i32;
    let animator = GlitchAnimator::new(
        ContextCanvas { element, context },
        config,
        measure(&window, &container),
        now(&window),
    )
    .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let shared = Rc::new(RefCell::new(Background {
        animator,
        resize_timeout: None,
    }));
    let frame: FrameCallback = Rc::new(RefCell::new(None));

    *frame.borrow_mut() = Some({
        let frame = frame.clone();
        let shared = shared.clone();
        let window = window.clone();
        Closure::<dyn FnMut(f64)>::new(move |timestamp: f64| {
            let callback = frame.borrow();
            let Some(callback) = callback.as_ref() else {
                return;
            };
            let mut scheduler = RafScheduler {
                window: &window,
                callback,
            };
            shared.borrow_mut().animator.on_frame(millis(timestamp), &mut scheduler);
        })
    });

    watch_visibility(&window, &document, &shared, &frame)?;
    watch_resize(&window, &container, &shared, debounce_ms)?;

    let callback = frame.borrow();
    if let Some(callback) = callback.as_ref() {
        let mut scheduler = RafScheduler {
            window: &window,
            callback,
        };
        shared.borrow_mut().animator.start(now(&window), &mut scheduler);
    }

    Ok(())
}

fn watch_visibility(
    window: &Window,
    document: &Document,
    shared: &Rc<RefCell<Background>>,
    frame: &FrameCallback,
) -> Result<(), JsValue> {
    let listener = {
        let window = window.clone();
        let document = document.clone();
        let shared = shared.clone();
        let frame = frame.clone();
        Closure::<dyn FnMut()>::new(move || {
            let visibility = match document.visibility_state() {
                VisibilityState::Hidden => Visibility::Hidden,
                _ => Visibility::Visible,
            };
            let callback = frame.borrow();
            let Some(callback) = callback.as_ref() else {
                return;
            };
            let mut scheduler = RafScheduler {
                window: &window,
                callback,
            };
            shared
                .borrow_mut()
                .animator
                .set_visibility(visibility, now(&window), &mut scheduler);
        })
    };

    document.add_event_listener_with_callback("visibilitychange", listener.as_ref().unchecked_ref())?;
    // Lives as long as the page.
    listener.forget();
    Ok(())
}

fn watch_resize(
    window: &Window,
    container: &Element,
    shared: &Rc<RefCell<Background>>,
    debounce_ms: i32,
) -> Result<(), JsValue> {
    let apply = {
        let window = window.clone();
        let container = container.clone();
        let shared = shared.clone();
        Closure::<dyn FnMut()>::new(move || {
            let mut background = shared.borrow_mut();
            background.resize_timeout = None;
            background.animator.resize(measure(&window, &container));
        })
    };

    let listener = {
        let window = window.clone();
        let shared = shared.clone();
        Closure::<dyn FnMut()>::new(move || {
            let mut background = shared.borrow_mut();
            if let Some(id) = background.resize_timeout.take() {
                window.clear_timeout_with_handle(id);
            }
            match window.set_timeout_with_callback_and_timeout_and_arguments_0(
                apply.as_ref().unchecked_ref(),
                debounce_ms,
            ) {
                Ok(id) => background.resize_timeout = Some(id),
                Err(err) => warn(&format!("glitch background: setTimeout failed: {}", describe(&err))),
            }
        })
    };

    window.add_event_listener_with_callback("resize", listener.as_ref().unchecked_ref())?;
    listener.forget();
    Ok(())
}

/// [`ScriptHost`] over the live document.
pub struct DomScriptHost {
    window: Window,
    document: Document,
    feed: Element,
    status: Option<Element>,
    on_load: Option<Function>,
    on_error: Option<Function>,
}

impl DomScriptHost {
    /// `instgrm.Embeds` and its `process` function, if the library is loaded.
    fn processor(&self) -> Result<(JsValue, Function), EmbedError> {
        let lookup = |target: &JsValue, key: &str| -> Result<JsValue, EmbedError> {
            let value = Reflect::get(target, &JsValue::from_str(key))
                .map_err(|err| EmbedError::Process(describe(&err)))?;
            if value.is_undefined() || value.is_null() {
                return Err(EmbedError::Process(format!("`{key}` is not defined")));
            }
            Ok(value)
        };

        let instgrm = lookup(self.window.as_ref(), "instgrm")?;
        let embeds = lookup(&instgrm, "Embeds")?;
        let process = lookup(&embeds, "process")?
            .dyn_into::<Function>()
            .map_err(|_| EmbedError::Process("`process` is not a function".into()))?;
        Ok((embeds, process))
    }

    fn listen(&self, script: &Element) -> Result<(), JsValue> {
        if let Some(on_load) = &self.on_load {
            script.add_event_listener_with_callback("load", on_load)?;
        }
        if let Some(on_error) = &self.on_error {
            script.add_event_listener_with_callback("error", on_error)?;
        }
        Ok(())
    }
}

impl ScriptHost for DomScriptHost {
    fn has_embeds(&self, selector: &str) -> bool {
        match self.feed.query_selector(selector) {
            Ok(found) => found.is_some(),
            Err(err) => {
                warn(&format!("embed feed: bad selector {selector}: {}", describe(&err)));
                false
            }
        }
    }

    fn embeds_ready(&self) -> bool {
        self.processor().is_ok()
    }

    fn script_present(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn inject_script(&mut self, id: &str, src: &str) -> Result<(), EmbedError> {
        let inject = || -> Result<(), JsValue> {
            let script: HtmlScriptElement = self.document.create_element("script")?.dyn_into()?;
            script.set_id(id);
            script.set_src(src);
            script.set_async(true);
            self.listen(&script)?;
            let parent = self
                .document
                .body()
                .ok_or_else(|| JsValue::from_str("document has no body"))?;
            parent.append_child(&script)?;
            Ok(())
        };

        inject().map_err(|err| EmbedError::Inject(describe(&err)))
    }

    fn watch_script(&mut self, id: &str) -> Result<(), EmbedError> {
        let script = self
            .document
            .get_element_by_id(id)
            .ok_or_else(|| EmbedError::Inject(format!("script #{id} vanished")))?;
        self.listen(&script).map_err(|err| EmbedError::Inject(describe(&err)))
    }

    fn remove_script(&mut self, id: &str) {
        if let Some(script) = self.document.get_element_by_id(id) {
            script.remove();
        }
    }

    fn process_embeds(&mut self) -> Result<(), EmbedError> {
        let (embeds, process) = self.processor()?;
        process
            .call0(&embeds)
            .map(|_| ())
            .map_err(|err| EmbedError::Process(describe(&err)))
    }

    fn set_status(&mut self, text: &str) {
        if let Some(status) = &self.status {
            status.set_text_content(Some(text));
        }
    }
}

/// Load the embed script into the page and wire the refresh button.
/// Missing feed container means nothing to do; button and status element
/// are optional.
#[wasm_bindgen(js_name = mountEmbedFeed)]
pub fn mount_embed_feed(feed_selector: &str, button_selector: &str, status_selector: &str) {
    if let Err(err) = try_mount_feed(feed_selector, button_selector, status_selector) {
        warn(&format!("embed feed disabled: {}", describe(&err)));
    }
}

fn try_mount_feed(feed_selector: &str, button_selector: &str, status_selector: &str) -> Result<(), JsValue> {
    let Some(window) = web_sys::window() else {
        return Ok(());
    };
    let Some(document) = window.document() else {
        return Ok(());
    };
    let Some(feed) = document.query_selector(feed_selector)? else {
        return Ok(());
    };

    let host = DomScriptHost {
        status: document.query_selector(status_selector)?,
        feed,
        window,
        document: document.clone(),
        on_load: None,
        on_error: None,
    };
    let loader = Rc::new(RefCell::new(EmbedLoader::new(host, EmbedConfig::default())));

    let on_load = {
        let loader = loader.clone();
        Closure::<dyn FnMut()>::new(move || loader.borrow_mut().script_loaded())
    };
    let on_error = {
        let loader = loader.clone();
        Closure::<dyn FnMut()>::new(move || loader.borrow_mut().script_failed("network error"))
    };
    {
        let mut loader = loader.borrow_mut();
        let host = loader.host_mut();
        host.on_load = Some(on_load.as_ref().unchecked_ref::<Function>().clone());
        host.on_error = Some(on_error.as_ref().unchecked_ref::<Function>().clone());
    }
    on_load.forget();
    on_error.forget();

    if let Some(button) = document.query_selector(button_selector)? {
        let click = {
            let loader = loader.clone();
            Closure::<dyn FnMut()>::new(move || loader.borrow_mut().refresh())
        };
        button.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();
    }

    loader.borrow_mut().refresh();
    Ok(())
}
