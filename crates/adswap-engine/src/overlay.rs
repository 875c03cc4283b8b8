//! Close/info button chrome injected next to a substituted creative.
//!
//! Real ad slots carry a close button and an info badge in their top-right
//! corner; substitutions look wrong without them. Four style combinations
//! are supported (cross or dots close button, plain SVG or AdChoices badge
//! info button), plus `none` which suppresses injection entirely. The
//! mutation scripts tag every injected node so restore can remove them.

use adswap_types::ButtonStyle;

const CROSS_SVG: &str = r##"<svg width="15" height="15" viewBox="0 0 15 15" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M4 4L11 11M11 4L4 11" stroke="#00aecd" stroke-width="1.5" stroke-linecap="round"/></svg>"##;

const DOTS_SVG: &str = r##"<svg width="15" height="15" viewBox="0 0 15 15" fill="none" xmlns="http://www.w3.org/2000/svg"><circle cx="7.5" cy="3.5" r="1.5" fill="#00aecd"/><circle cx="7.5" cy="7.5" r="1.5" fill="#00aecd"/><circle cx="7.5" cy="11.5" r="1.5" fill="#00aecd"/></svg>"##;

const INFO_SVG: &str = r##"<svg width="15" height="15" viewBox="0 0 15 15" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M7.5 1.5a6 6 0 100 12 6 6 0 100-12m0 1a5 5 0 110 10 5 5 0 110-10zM6.625 11h1.75V6.5h-1.75zM7.5 3.75a1 1 0 100 2 1 1 0 100-2z" fill="#00aecd"/></svg>"##;

const ADCHOICES_IMG: &str = r#"<img src="https://tpc.googlesyndication.com/pagead/images/adchoices/adchoices_blue_wb.png" width="15" height="15" style="display:block;width:15px;height:15px;">"#;

const CLOSE_CSS: &str = "position:absolute;top:0px;right:0px;width:15px;height:15px;z-index:101;display:block;background-color:rgba(255,255,255,1);border-radius:2px;cursor:pointer;";

const INFO_CSS: &str = "position:absolute;top:0px;right:17px;width:15px;height:15px;z-index:100;display:block;background-color:rgba(255,255,255,1);border-radius:2px;cursor:pointer;";

const ADCHOICES_CSS: &str =
    "position:absolute;top:0px;right:17px;width:15px;height:15px;z-index:100;display:block;cursor:pointer;";

/// Markup and inline CSS for one close/info button pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayButtons {
    pub close_html: String,
    pub close_css: String,
    pub info_html: String,
    pub info_css: String,
}

/// The button pair for a configured style, or `None` when injection is
/// suppressed.
pub fn buttons_for(style: ButtonStyle) -> Option<OverlayButtons> {
    let (close_html, info_html, info_css) = match style {
        ButtonStyle::PlainCross => (CROSS_SVG, INFO_SVG, INFO_CSS),
        ButtonStyle::PlainDots => (DOTS_SVG, INFO_SVG, INFO_CSS),
        ButtonStyle::BrandedCross => (CROSS_SVG, ADCHOICES_IMG, ADCHOICES_CSS),
        ButtonStyle::BrandedDots => (DOTS_SVG, ADCHOICES_IMG, ADCHOICES_CSS),
        ButtonStyle::None => return None,
    };
    Some(OverlayButtons {
        close_html: close_html.to_string(),
        close_css: CLOSE_CSS.to_string(),
        info_html: info_html.to_string(),
        info_css: info_css.to_string(),
    })
}
