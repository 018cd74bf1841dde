use crate::core::{AudioBackend, AudioGraph, OverlayError};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

fn js_err(label: &'static str) -> impl Fn(JsValue) -> OverlayError {
    move |e| OverlayError::Audio(format!("{} error: {:?}", label, e))
}

fn create_gain(ctx: &web::AudioContext, value: f32) -> Result<web::GainNode, OverlayError> {
    let g = web::GainNode::new(ctx).map_err(js_err("GainNode"))?;
    g.gain().set_value(value);
    Ok(g)
}

fn create_analyser(ctx: &web::AudioContext, fft_size: u32) -> Result<web::AnalyserNode, OverlayError> {
    let a = web::AnalyserNode::new(ctx).map_err(js_err("AnalyserNode"))?;
    a.set_fft_size(fft_size);
    Ok(a)
}

/// WebAudio playback graph for one `<audio>` element. Every node is optional
/// so a partially built graph can be released the same way as a full one.
#[derive(Default)]
pub struct WebAudioGraph {
    ctx: Option<web::AudioContext>,
    source: Option<web::MediaElementAudioSourceNode>,
    gain: Option<web::GainNode>,
    analyser: Option<web::AnalyserNode>,
}

impl WebAudioGraph {
    pub fn context(&self) -> Option<&web::AudioContext> {
        self.ctx.as_ref()
    }

    fn connect(
        &mut self,
        track: &web::HtmlAudioElement,
        fft_size: u32,
        volume: f32,
    ) -> Result<(), OverlayError> {
        let ctx = web::AudioContext::new()
            .map_err(|e| OverlayError::Unsupported(format!("AudioContext: {:?}", e)))?;
        let ctx = self.ctx.insert(ctx);

        let analyser = self.analyser.insert(create_analyser(ctx, fft_size)?);
        let gain = self.gain.insert(create_gain(ctx, volume)?);
        let source = self.source.insert(
            ctx.create_media_element_source(track)
                .map_err(js_err("MediaElementSource"))?,
        );

        source
            .connect_with_audio_node(gain)
            .map_err(js_err("connect source"))?;
        gain.connect_with_audio_node(analyser)
            .map_err(js_err("connect gain"))?;
        analyser
            .connect_with_audio_node(&ctx.destination())
            .map_err(js_err("connect analyser"))?;
        Ok(())
    }
}

impl AudioGraph for WebAudioGraph {
    fn frequency_bin_count(&self) -> usize {
        self.analyser
            .as_ref()
            .map(|a| a.frequency_bin_count() as usize)
            .unwrap_or(0)
    }

    fn byte_frequency_data(&self, out: &mut [u8]) {
        if let Some(a) = &self.analyser {
            a.get_byte_frequency_data(out);
        }
    }

    fn set_gain(&self, value: f32) {
        if let Some(g) = &self.gain {
            g.gain().set_value(value);
        }
    }

    fn gain(&self) -> f32 {
        self.gain.as_ref().map(|g| g.gain().value()).unwrap_or(0.0)
    }

    fn release(&mut self) {
        if let Some(s) = self.source.take() {
            _ = s.disconnect();
        }
        if let Some(g) = self.gain.take() {
            _ = g.disconnect();
        }
        if let Some(a) = self.analyser.take() {
            _ = a.disconnect();
        }
        if let Some(ctx) = self.ctx.take() {
            _ = ctx.close();
        }
    }
}

/// Builds [`WebAudioGraph`]s routed from an `<audio>` element.
pub struct WebAudio;

impl AudioBackend for WebAudio {
    type Track = web::HtmlAudioElement;
    type Graph = WebAudioGraph;

    fn build_graph(
        &mut self,
        track: &web::HtmlAudioElement,
        fft_size: u32,
        volume: f32,
    ) -> Result<WebAudioGraph, OverlayError> {
        let mut graph = WebAudioGraph::default();
        match graph.connect(track, fft_size, volume) {
            Ok(()) => Ok(graph),
            Err(e) => {
                graph.release();
                Err(e)
            }
        }
    }
}

/// Create the looping track element. Playback waits for the readiness signal.
pub fn create_track(url: &str) -> anyhow::Result<web::HtmlAudioElement> {
    let audio = web::HtmlAudioElement::new_with_src(url)
        .map_err(|e| anyhow::anyhow!("HtmlAudioElement: {:?}", e))?;
    audio.set_loop(true);
    audio.set_preload("auto");
    Ok(audio)
}

/// Stop the element and drop its buffered media.
pub fn detach_track(audio: &web::HtmlAudioElement) {
    _ = audio.pause();
    _ = audio.remove_attribute("src");
    audio.load();
}

/// Resume a context the browser created suspended.
pub async fn resume_if_suspended(ctx: &web::AudioContext) -> Result<(), OverlayError> {
    if ctx.state() != web::AudioContextState::Suspended {
        return Ok(());
    }
    let promise = ctx.resume().map_err(js_err("resume"))?;
    JsFuture::from(promise)
        .await
        .map(|_| ())
        .map_err(|e| OverlayError::PermissionDenied(format!("resume: {:?}", e)))
}

/// Ask the element to start. Rejection means autoplay was refused.
pub async fn request_play(audio: &web::HtmlAudioElement) -> Result<(), OverlayError> {
    let promise = audio
        .play()
        .map_err(|e| OverlayError::PermissionDenied(format!("play: {:?}", e)))?;
    JsFuture::from(promise)
        .await
        .map(|_| ())
        .map_err(|e| OverlayError::PermissionDenied(format!("play: {:?}", e)))
}
