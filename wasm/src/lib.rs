use serde::Deserialize;
use stacked_area_renderer::chart::encode_image_source;
use stacked_area_renderer::render_settings_svg;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StackedAreaRenderOptions {
    /// Return a `data:image/svg+xml;base64,` URI instead of markup.
    image_source: Option<bool>,
}

fn render(settings_json: &str, options: StackedAreaRenderOptions) -> Result<String, String> {
    let svg = render_settings_svg(settings_json).map_err(|error| error.to_string())?;
    if options.image_source.unwrap_or(false) {
        Ok(encode_image_source(&svg))
    } else {
        Ok(svg)
    }
}

#[wasm_bindgen]
pub fn render_stacked_area_svg(
    settings_json: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = match options_json {
        Some(raw_options) => serde_json::from_str::<StackedAreaRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?,
        None => StackedAreaRenderOptions::default(),
    };
    render(settings_json, options).map_err(|error| JsValue::from_str(&error))
}
