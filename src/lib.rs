#![cfg(target_arch = "wasm32")]
use crate::core::Theme;
use render::ShaderEffect;
use visualizer::AudioVisualizer;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys as web;

mod audio;
pub mod core;
mod dom;
pub mod frame;
mod render;
pub mod resize;
mod ui;
mod visualizer;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("crt-overlay starting");
    Ok(())
}

/// Handle to a mounted overlay. Dropping it from JS (`free()`) or calling
/// `unmount()` releases every loop, listener and audio resource.
#[wasm_bindgen]
pub struct RetroOverlay {
    crt: Option<ShaderEffect>,
    audio: Option<AudioVisualizer>,
}

#[wasm_bindgen]
impl RetroOverlay {
    /// Mount using the default element ids.
    pub fn mount() -> RetroOverlay {
        Self::mount_with(
            crate::core::DEFAULT_CANVAS_ID,
            crate::core::DEFAULT_BARS_ID,
        )
    }

    /// Mount onto `#canvas_id`, rendering bars into `#bars_id`. Missing
    /// elements or capabilities leave that layer disabled; this never throws.
    pub fn mount_with(canvas_id: &str, bars_id: &str) -> RetroOverlay {
        let Some(document) = dom::window_document() else {
            log::warn!("no document; overlay disabled");
            return RetroOverlay {
                crt: None,
                audio: None,
            };
        };
        let config = dom::read_config(&document, canvas_id, bars_id);

        let crt = match find_canvas(&document, &config.canvas_id) {
            Ok(canvas) => Some(ShaderEffect::mount(canvas)),
            Err(e) => {
                log::warn!("[crt] disabled: {:?}", e);
                None
            }
        };

        let bars = document.get_element_by_id(&config.bars_id);
        let audio = match AudioVisualizer::mount(
            &config.track_url,
            config.initial_volume,
            bars,
            config.theme,
        ) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("[audio] disabled: {:?}", e);
                None
            }
        };

        RetroOverlay { crt, audio }
    }

    /// Live volume in \[0, 1\]; takes effect on the next tick.
    pub fn set_volume(&self, volume: f32) {
        if let Some(a) = &self.audio {
            a.set_volume(volume);
        }
    }

    /// `"green"` or `"amber"`; anything else is ignored.
    pub fn set_theme(&self, name: &str) {
        match (Theme::parse(name), &self.audio) {
            (Some(theme), Some(a)) => a.set_theme(theme),
            (None, _) => log::warn!("unknown theme {:?}", name),
            _ => {}
        }
    }

    pub fn playback_state(&self) -> String {
        self.audio
            .as_ref()
            .map(|a| a.playback_state().name())
            .unwrap_or("disabled")
            .to_string()
    }

    pub fn crt_running(&self) -> bool {
        self.crt.as_ref().map(ShaderEffect::is_running).unwrap_or(false)
    }

    /// Idempotent.
    pub fn unmount(&mut self) {
        if let Some(crt) = self.crt.take() {
            crt.unmount();
        }
        if let Some(audio) = self.audio.take() {
            audio.unmount();
        }
    }
}

impl Drop for RetroOverlay {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn find_canvas(document: &web::Document, id: &str) -> anyhow::Result<web::HtmlCanvasElement> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| anyhow::anyhow!("missing #{}", id))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))
}
