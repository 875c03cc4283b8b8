//! Content-kind dispatched mutation and restore scripts.
//!
//! Every script takes `(epoch, index, ...)` and resolves its element
//! through the scan arena (`window.__adswapScan`); a missing arena or
//! mismatched epoch yields the string `'stale'` and nothing is touched.
//!
//! Mutation leaves restore breadcrumbs on every node it modifies:
//!
//! - `data-adswap-src` — the original `src` of a swapped image
//! - `data-adswap-style` / `data-adswap-nostyle` — the exact prior state
//!   of the inline `style` attribute (value, or the fact it was absent)
//! - `data-adswap-overlay` — on injected close/info buttons
//! - `data-adswap-injected` — on images overlaid across hidden frames
//!
//! The matching restore script replays the breadcrumbs and removes the
//! markers, so after restore every touched attribute equals its
//! pre-mutation snapshot exactly and no injected node remains.
//!
//! Scripts report `'ok'`, `'unchanged'` (mutation produced no observable
//! change — the surface is skipped), or `'stale'`.

use serde_json::Value;

use adswap_types::{Region, SwapError};

use crate::scanner::SurfaceKind;

/// The mutate/restore script pair for one content kind.
#[derive(Debug, Clone, Copy)]
pub struct KindScripts {
    pub mutate: &'static str,
    pub restore: &'static str,
}

impl SurfaceKind {
    /// Select the script pair for this kind. Exhaustive by construction:
    /// a new kind will not compile until it carries its own pair.
    pub fn scripts(self) -> KindScripts {
        match self {
            SurfaceKind::Image => KindScripts {
                mutate: MUTATE_IMAGE_FN,
                restore: RESTORE_IMAGE_FN,
            },
            SurfaceKind::Frame => KindScripts {
                mutate: MUTATE_FRAME_FN,
                restore: RESTORE_FRAME_FN,
            },
            SurfaceKind::Background => KindScripts {
                mutate: MUTATE_BACKGROUND_FN,
                restore: RESTORE_BACKGROUND_FN,
            },
        }
    }
}

/// Outcome string decoder shared by the mutation scripts.
pub fn decode_outcome(value: &Value) -> Result<MutationStatus, SwapError> {
    match value.as_str() {
        Some("ok") => Ok(MutationStatus::Applied),
        Some("unchanged") => Ok(MutationStatus::Unchanged),
        Some("stale") => Ok(MutationStatus::Stale),
        other => Err(SwapError::Browser(format!(
            "unexpected mutation script result: {other:?}"
        ))),
    }
}

/// What a mutation or restore script reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Applied,
    Unchanged,
    Stale,
}

/// Re-check that a surface still has the target dimensions.
/// Arguments: `(epoch, index, width, height)`. Returns
/// `'ok' | 'changed' | 'stale'`.
pub const VERIFY_SURFACE_FN: &str = r#"function (epoch, index, w, h) {
    var reg = window.__adswapScan;
    if (!reg || reg.epoch !== epoch) return 'stale';
    var el = reg.nodes[index];
    if (!el || !el.isConnected) return 'stale';
    var rect = el.getBoundingClientRect();
    return (Math.round(rect.width) === w && Math.round(rect.height) === h)
        ? 'ok' : 'changed';
}"#;

/// Swap the source of content images inside (or at) the surface.
/// Arguments: `(epoch, index, src, closeHtml, closeCss, infoHtml, infoCss,
/// withButtons)`.
pub const MUTATE_IMAGE_FN: &str = r#"function (epoch, index, src, closeHtml, closeCss, infoHtml, infoCss, withButtons) {
    var reg = window.__adswapScan;
    if (!reg || reg.epoch !== epoch) return 'stale';
    var container = reg.nodes[index];
    if (!container || !container.isConnected) return 'stale';

    function stashStyle(el) {
        if (el.hasAttribute('data-adswap-style') || el.hasAttribute('data-adswap-nostyle')) return;
        if (el.hasAttribute('style')) {
            el.setAttribute('data-adswap-style', el.getAttribute('style'));
        } else {
            el.setAttribute('data-adswap-nostyle', '1');
        }
    }
    function addButtons(parent) {
        if (!withButtons) return;
        stashStyle(parent);
        if (window.getComputedStyle(parent).position === 'static') {
            parent.style.position = 'relative';
        }
        var info = document.createElement('div');
        info.setAttribute('data-adswap-overlay', '1');
        info.innerHTML = infoHtml;
        info.style.cssText = infoCss;
        var close = document.createElement('div');
        close.setAttribute('data-adswap-overlay', '1');
        close.innerHTML = closeHtml;
        close.style.cssText = closeCss;
        parent.appendChild(info);
        parent.appendChild(close);
    }

    var imgs = container.tagName === 'IMG'
        ? [container]
        : Array.prototype.slice.call(container.querySelectorAll('img'));
    var replaced = 0;
    for (var i = 0; i < imgs.length; i++) {
        var img = imgs[i];
        var rect = img.getBoundingClientRect();
        var isControl = rect.width < 50 || rect.height < 50 ||
            (typeof img.className === 'string' && img.className.indexOf('abg') !== -1) ||
            (img.id || '').indexOf('abg') !== -1 ||
            (img.src || '').indexOf('googleads') !== -1 ||
            (img.src || '').indexOf('googlesyndication') !== -1 ||
            (img.src || '').indexOf('adchoices') !== -1 ||
            (img.alt || '').toLowerCase().indexOf('close') !== -1;
        if (isControl || !img.src || img.src.indexOf('data:') === 0) continue;

        img.setAttribute('data-adswap-src', img.src);
        stashStyle(img);
        img.src = src;
        if (img.src.indexOf('data:') !== 0) {
            img.src = img.getAttribute('data-adswap-src');
            img.removeAttribute('data-adswap-src');
            continue;
        }
        img.style.objectFit = 'contain';
        img.style.width = '100%';
        img.style.height = 'auto';
        img.style.display = 'block';
        addButtons(img.parentElement || container);
        replaced++;
    }
    return replaced > 0 ? 'ok' : 'unchanged';
}"#;

/// Restore swapped image sources, stashed styles, and injected buttons.
/// Arguments: `(epoch, index)`.
pub const RESTORE_IMAGE_FN: &str = r#"function (epoch, index) {
    var reg = window.__adswapScan;
    if (!reg || reg.epoch !== epoch) return 'stale';
    var container = reg.nodes[index];
    if (!container || !container.isConnected) return 'stale';
    var scope = container.parentElement || container;

    var overlays = scope.querySelectorAll('[data-adswap-overlay]');
    for (var i = overlays.length - 1; i >= 0; i--) {
        overlays[i].parentNode.removeChild(overlays[i]);
    }

    var swapped = Array.prototype.slice.call(scope.querySelectorAll('[data-adswap-src]'));
    if (scope.hasAttribute('data-adswap-src')) swapped.push(scope);
    for (var j = 0; j < swapped.length; j++) {
        swapped[j].src = swapped[j].getAttribute('data-adswap-src');
        swapped[j].removeAttribute('data-adswap-src');
    }

    var styled = Array.prototype.slice.call(
        scope.querySelectorAll('[data-adswap-style], [data-adswap-nostyle]'));
    if (scope.hasAttribute('data-adswap-style') || scope.hasAttribute('data-adswap-nostyle')) {
        styled.push(scope);
    }
    for (var k = 0; k < styled.length; k++) {
        var el = styled[k];
        if (el.hasAttribute('data-adswap-style')) {
            el.setAttribute('style', el.getAttribute('data-adswap-style'));
            el.removeAttribute('data-adswap-style');
        } else {
            el.removeAttribute('style');
            el.removeAttribute('data-adswap-nostyle');
        }
    }
    return 'ok';
}"#;

/// Hide embedded frames and overlay the creative across their boxes.
/// Arguments match [`MUTATE_IMAGE_FN`].
pub const MUTATE_FRAME_FN: &str = r#"function (epoch, index, src, closeHtml, closeCss, infoHtml, infoCss, withButtons) {
    var reg = window.__adswapScan;
    if (!reg || reg.epoch !== epoch) return 'stale';
    var container = reg.nodes[index];
    if (!container || !container.isConnected) return 'stale';

    function stashStyle(el) {
        if (el.hasAttribute('data-adswap-style') || el.hasAttribute('data-adswap-nostyle')) return;
        if (el.hasAttribute('style')) {
            el.setAttribute('data-adswap-style', el.getAttribute('style'));
        } else {
            el.setAttribute('data-adswap-nostyle', '1');
        }
    }

    var frames = container.tagName === 'IFRAME'
        ? [container]
        : Array.prototype.slice.call(container.querySelectorAll('iframe'));
    var replaced = 0;
    var buttonsHost = null;
    for (var i = 0; i < frames.length; i++) {
        var frame = frames[i];
        var host = frame.parentElement;
        if (!host) continue;
        var fRect = frame.getBoundingClientRect();

        stashStyle(host);
        if (window.getComputedStyle(host).position === 'static') {
            host.style.position = 'relative';
        }
        var hRect = host.getBoundingClientRect();

        stashStyle(frame);
        frame.style.visibility = 'hidden';

        var overlay = document.createElement('img');
        overlay.setAttribute('data-adswap-injected', '1');
        overlay.src = src;
        overlay.style.position = 'absolute';
        overlay.style.top = (fRect.top - hRect.top) + 'px';
        overlay.style.left = (fRect.left - hRect.left) + 'px';
        overlay.style.width = Math.round(fRect.width) + 'px';
        overlay.style.height = Math.round(fRect.height) + 'px';
        overlay.style.objectFit = 'contain';
        overlay.style.zIndex = '1';
        host.appendChild(overlay);
        buttonsHost = host;
        replaced++;
    }

    if (replaced > 0 && withButtons && buttonsHost) {
        var info = document.createElement('div');
        info.setAttribute('data-adswap-overlay', '1');
        info.innerHTML = infoHtml;
        info.style.cssText = infoCss;
        var close = document.createElement('div');
        close.setAttribute('data-adswap-overlay', '1');
        close.innerHTML = closeHtml;
        close.style.cssText = closeCss;
        buttonsHost.appendChild(info);
        buttonsHost.appendChild(close);
    }
    return replaced > 0 ? 'ok' : 'unchanged';
}"#;

/// Remove frame overlays, restore frame visibility and stashed styles.
/// Arguments: `(epoch, index)`.
pub const RESTORE_FRAME_FN: &str = r#"function (epoch, index) {
    var reg = window.__adswapScan;
    if (!reg || reg.epoch !== epoch) return 'stale';
    var container = reg.nodes[index];
    if (!container || !container.isConnected) return 'stale';
    var scope = container.parentElement || container;

    var injected = scope.querySelectorAll('[data-adswap-overlay], [data-adswap-injected]');
    for (var i = injected.length - 1; i >= 0; i--) {
        injected[i].parentNode.removeChild(injected[i]);
    }

    var styled = Array.prototype.slice.call(
        scope.querySelectorAll('[data-adswap-style], [data-adswap-nostyle]'));
    if (scope.hasAttribute('data-adswap-style') || scope.hasAttribute('data-adswap-nostyle')) {
        styled.push(scope);
    }
    for (var k = 0; k < styled.length; k++) {
        var el = styled[k];
        if (el.hasAttribute('data-adswap-style')) {
            el.setAttribute('style', el.getAttribute('data-adswap-style'));
            el.removeAttribute('data-adswap-style');
        } else {
            el.removeAttribute('style');
            el.removeAttribute('data-adswap-nostyle');
        }
    }
    return 'ok';
}"#;

/// Rewrite the surface's background image.
/// Arguments match [`MUTATE_IMAGE_FN`].
pub const MUTATE_BACKGROUND_FN: &str = r#"function (epoch, index, src, closeHtml, closeCss, infoHtml, infoCss, withButtons) {
    var reg = window.__adswapScan;
    if (!reg || reg.epoch !== epoch) return 'stale';
    var container = reg.nodes[index];
    if (!container || !container.isConnected) return 'stale';

    if (container.hasAttribute('style')) {
        container.setAttribute('data-adswap-style', container.getAttribute('style'));
    } else {
        container.setAttribute('data-adswap-nostyle', '1');
    }

    container.style.backgroundImage = 'url(' + src + ')';
    container.style.backgroundSize = 'contain';
    container.style.backgroundRepeat = 'no-repeat';
    container.style.backgroundPosition = 'center';

    if (window.getComputedStyle(container).backgroundImage.indexOf('data:') === -1) {
        if (container.hasAttribute('data-adswap-style')) {
            container.setAttribute('style', container.getAttribute('data-adswap-style'));
            container.removeAttribute('data-adswap-style');
        } else {
            container.removeAttribute('style');
            container.removeAttribute('data-adswap-nostyle');
        }
        return 'unchanged';
    }

    if (withButtons) {
        if (window.getComputedStyle(container).position === 'static') {
            container.style.position = 'relative';
        }
        var info = document.createElement('div');
        info.setAttribute('data-adswap-overlay', '1');
        info.innerHTML = infoHtml;
        info.style.cssText = infoCss;
        var close = document.createElement('div');
        close.setAttribute('data-adswap-overlay', '1');
        close.innerHTML = closeHtml;
        close.style.cssText = closeCss;
        container.appendChild(info);
        container.appendChild(close);
    }
    return 'ok';
}"#;

/// Restore the background surface's style and remove injected buttons.
/// Arguments: `(epoch, index)`.
pub const RESTORE_BACKGROUND_FN: &str = r#"function (epoch, index) {
    var reg = window.__adswapScan;
    if (!reg || reg.epoch !== epoch) return 'stale';
    var container = reg.nodes[index];
    if (!container || !container.isConnected) return 'stale';

    var overlays = container.querySelectorAll('[data-adswap-overlay]');
    for (var i = overlays.length - 1; i >= 0; i--) {
        overlays[i].parentNode.removeChild(overlays[i]);
    }

    if (container.hasAttribute('data-adswap-style')) {
        container.setAttribute('style', container.getAttribute('data-adswap-style'));
        container.removeAttribute('data-adswap-style');
    } else if (container.hasAttribute('data-adswap-nostyle')) {
        container.removeAttribute('style');
        container.removeAttribute('data-adswap-nostyle');
    }
    return 'ok';
}"#;

/// Best-effort removal of full-viewport overlay elements (interstitials,
/// popups, fixed-position ad layers). Returns the removal count. This is a
/// page-prep step, not part of the reversible mutation cycle.
pub const STRIP_OVERLAYS_FN: &str = r#"function () {
    var selectors = [
        'div[style*="position: fixed"][style*="z-index"]',
        '.overlay',
        '.modal-overlay',
        '.popup-overlay',
        '.ad-overlay',
        '.interstitial',
        'div[id*="google_ads_iframe"]',
        'ins.adsbygoogle[style*="position: fixed"]',
        '[class*="fullscreen"]',
        '[class*="popup"]',
        '[id*="popup"]'
    ];
    var removed = 0;
    selectors.forEach(function (selector) {
        var elements;
        try {
            elements = document.querySelectorAll(selector);
        } catch (e) {
            return;
        }
        for (var i = 0; i < elements.length; i++) {
            var el = elements[i];
            var rect = el.getBoundingClientRect();
            var style = window.getComputedStyle(el);
            var coversViewport =
                (rect.width >= window.innerWidth * 0.8 && rect.height >= window.innerHeight * 0.8) ||
                (style.position === 'fixed' &&
                    (style.top === '0px' || style.top === '0') &&
                    (style.left === '0px' || style.left === '0') &&
                    (rect.width >= window.innerWidth * 0.5 || rect.height >= window.innerHeight * 0.5));
            if (coversViewport && style.display !== 'none') {
                el.remove();
                removed++;
            }
        }
    });
    if (document.body && document.body.style.overflow === 'hidden') {
        document.body.style.overflow = 'auto';
    }
    return removed;
}"#;

/// Scroll the surface to a fixed viewport offset (fraction from the top)
/// and return its viewport-relative box for clip capture.
/// Arguments: `(epoch, index, fraction)`. Returns the box or `'stale'`.
pub const SCROLL_SURFACE_FN: &str = r#"function (epoch, index, fraction) {
    var reg = window.__adswapScan;
    if (!reg || reg.epoch !== epoch) return 'stale';
    var el = reg.nodes[index];
    if (!el || !el.isConnected) return 'stale';
    var rect = el.getBoundingClientRect();
    var docTop = rect.top + window.pageYOffset;
    window.scrollTo(0, Math.max(0, docTop - window.innerHeight * fraction));
    var after = el.getBoundingClientRect();
    return { x: after.left, y: after.top, width: after.width, height: after.height };
}"#;

/// Parse the scroll script's return value into a clip region.
pub fn parse_scroll_result(value: &Value) -> Result<Option<Region>, SwapError> {
    if value.as_str() == Some("stale") {
        return Ok(None);
    }
    let region: Region = serde_json::from_value(value.clone())
        .map_err(|e| SwapError::Browser(format!("unparsable scroll result: {e}")))?;
    Ok(Some(region))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_carries_its_own_pair() {
        let image = SurfaceKind::Image.scripts();
        let frame = SurfaceKind::Frame.scripts();
        let background = SurfaceKind::Background.scripts();

        assert!(image.mutate.contains("querySelectorAll('img')"));
        assert!(frame.mutate.contains("querySelectorAll('iframe')"));
        assert!(background.mutate.contains("backgroundImage"));
        assert_ne!(image.mutate, frame.mutate);
        assert_ne!(frame.mutate, background.mutate);
        assert_ne!(image.restore, background.restore);
    }

    #[test]
    fn every_script_guards_the_arena_epoch() {
        for script in [
            VERIFY_SURFACE_FN,
            MUTATE_IMAGE_FN,
            RESTORE_IMAGE_FN,
            MUTATE_FRAME_FN,
            RESTORE_FRAME_FN,
            MUTATE_BACKGROUND_FN,
            RESTORE_BACKGROUND_FN,
            SCROLL_SURFACE_FN,
        ] {
            assert!(script.contains("reg.epoch !== epoch"), "missing epoch guard");
            assert!(script.contains("'stale'"));
        }
    }

    #[test]
    fn mutations_leave_restore_breadcrumbs() {
        assert!(MUTATE_IMAGE_FN.contains("data-adswap-src"));
        assert!(MUTATE_IMAGE_FN.contains("data-adswap-style"));
        assert!(MUTATE_FRAME_FN.contains("data-adswap-injected"));
        assert!(MUTATE_BACKGROUND_FN.contains("data-adswap-style"));
        // And the restores consume them.
        assert!(RESTORE_IMAGE_FN.contains("data-adswap-src"));
        assert!(RESTORE_FRAME_FN.contains("data-adswap-injected"));
        assert!(RESTORE_BACKGROUND_FN.contains("data-adswap-overlay"));
    }

    #[test]
    fn image_mutation_excludes_control_buttons() {
        assert!(MUTATE_IMAGE_FN.contains("googlesyndication"));
        assert!(MUTATE_IMAGE_FN.contains("adchoices"));
        assert!(MUTATE_IMAGE_FN.contains("rect.width < 50"));
    }

    #[test]
    fn decode_outcome_values() {
        assert_eq!(
            decode_outcome(&Value::from("ok")).unwrap(),
            MutationStatus::Applied
        );
        assert_eq!(
            decode_outcome(&Value::from("unchanged")).unwrap(),
            MutationStatus::Unchanged
        );
        assert_eq!(
            decode_outcome(&Value::from("stale")).unwrap(),
            MutationStatus::Stale
        );
        assert!(decode_outcome(&Value::from(42)).is_err());
        assert!(decode_outcome(&Value::Null).is_err());
    }

    #[test]
    fn parse_scroll_result_region_and_stale() {
        let region = parse_scroll_result(&serde_json::json!({
            "x": 20.0, "y": 216.0, "width": 300.0, "height": 250.0
        }))
        .unwrap()
        .unwrap();
        assert_eq!(region.y, 216.0);
        assert_eq!(region.width, 300.0);

        assert!(parse_scroll_result(&Value::from("stale")).unwrap().is_none());
        assert!(parse_scroll_result(&Value::from(7)).is_err());
    }

    #[test]
    fn strip_overlays_is_not_reversible_mutation() {
        // The overlay strip must not leave adswap markers; it is permanent
        // page prep, not part of the restore contract.
        assert!(!STRIP_OVERLAYS_FN.contains("data-adswap"));
        assert!(STRIP_OVERLAYS_FN.contains("innerWidth"));
    }
}
