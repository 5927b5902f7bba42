//! Method hooks
//!
//! Ordered, per-method request classifiers that run before generic path
//! handling. A hook may fully answer a request (`Handled`) or decline
//! (`Declined`); earlier hooks take priority. Hooks may also annotate the
//! eventual response with extra headers without terminating the request.
//!
//! Both built-in hooks exist to support protocol-conformance test fixtures
//! exercising client robustness (CORS behavior and redirect handling) and
//! act only when their trigger query parameters are present.

use crate::handler::router::RequestContext;
use crate::http::{self, BoxedBody};
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Response};
use url::Url;

/// Outcome of a hook run.
pub enum HookOutcome {
    /// The hook fully answered the request.
    Handled(Response<BoxedBody>),
    /// The hook declined; later hooks and generic handling continue.
    Declined,
}

/// A request classifier registered for one HTTP method.
///
/// Headers inserted into `annotations` are merged into whatever response is
/// ultimately produced, whether by a hook or by generic handling.
pub trait MethodHook: Send + Sync {
    fn try_handle(&self, ctx: &RequestContext, annotations: &mut HeaderMap) -> HookOutcome;
}

/// Per-method ordered hook lists.
///
/// Only GET and POST carry hook lists; requests with any other method are
/// rejected with 405 before dispatch.
pub struct HookRegistry {
    get: Vec<Box<dyn MethodHook>>,
    post: Vec<Box<dyn MethodHook>>,
}

impl HookRegistry {
    #[must_use]
    pub fn with_default_hooks() -> Self {
        Self {
            get: vec![Box::new(CrossOriginHook), Box::new(RedirectHook)],
            post: vec![],
        }
    }

    /// Hook list for a method, or `None` when the method is unsupported.
    #[must_use]
    pub fn for_method(&self, method: &Method) -> Option<&[Box<dyn MethodHook>]> {
        match *method {
            Method::GET => Some(&self.get),
            Method::POST => Some(&self.post),
            _ => None,
        }
    }

    /// Run the hooks for `method` in order until one handles the request.
    pub fn run(
        &self,
        method: &Method,
        ctx: &RequestContext,
        annotations: &mut HeaderMap,
    ) -> Option<Response<BoxedBody>> {
        let hooks = self.for_method(method)?;
        for hook in hooks {
            if let HookOutcome::Handled(response) = hook.try_handle(ctx, annotations) {
                return Some(response);
            }
        }
        None
    }
}

/// Resource the cross-origin hook is pinned to.
const CORS_TEST_RESOURCE: &str = "/test/pdfs/basicapi.pdf";

/// Annotates responses for one fixed test resource with CORS headers when a
/// `cors` query flag and an `Origin` header are present. Never terminates the
/// request; generic handling continues with the annotations applied.
pub struct CrossOriginHook;

impl MethodHook for CrossOriginHook {
    fn try_handle(&self, ctx: &RequestContext, annotations: &mut HeaderMap) -> HookOutcome {
        if ctx.url.path() != CORS_TEST_RESOURCE {
            return HookOutcome::Declined;
        }
        let Some(mode) = ctx.query("cors") else {
            return HookOutcome::Declined;
        };
        let Some(origin) = ctx.origin.as_deref() else {
            return HookOutcome::Declined;
        };
        let Ok(origin_value) = HeaderValue::from_str(origin) else {
            return HookOutcome::Declined;
        };

        annotations.insert(
            HeaderName::from_static("access-control-allow-origin"),
            origin_value,
        );
        if mode == "withCredentials" {
            // withoutCredentials does not include Access-Control-Allow-Credentials.
            annotations.insert(
                HeaderName::from_static("access-control-allow-credentials"),
                HeaderValue::from_static("true"),
            );
        }
        annotations.insert(
            HeaderName::from_static("access-control-expose-headers"),
            HeaderValue::from_static("Accept-Ranges,Content-Range"),
        );
        annotations.insert(
            HeaderName::from_static("vary"),
            HeaderValue::from_static("Origin"),
        );
        HookOutcome::Declined
    }
}

/// Issues a 302 to the same URL with the hostname replaced when a
/// `redirectToHost` query parameter is present.
///
/// With `redirectIfRange` set, requests without a Range header pass through
/// un-redirected so the direct response can be observed first.
pub struct RedirectHook;

impl MethodHook for RedirectHook {
    fn try_handle(&self, ctx: &RequestContext, annotations: &mut HeaderMap) -> HookOutcome {
        let target_host = ctx.query("redirectToHost").filter(|v| !v.is_empty());
        let Some(target_host) = target_host else {
            return HookOutcome::Declined;
        };

        // Byte range requests must never be served from a client cache here,
        // or the redirected range would not reach the server at all.
        annotations.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store,max-age=0"),
        );

        let redirect_if_range = ctx
            .query("redirectIfRange")
            .is_some_and(|v| !v.is_empty());
        if redirect_if_range && ctx.range_header.is_none() {
            return HookOutcome::Declined;
        }

        match build_redirect_url(&ctx.url, &target_host) {
            Some(location) => HookOutcome::Handled(http::build_302_response(location.as_str())),
            None => HookOutcome::Handled(http::build_500_response()),
        }
    }
}

/// Replace the hostname and strip the trigger parameters.
///
/// The resulting hostname must exactly equal the requested one; hosts that
/// the URL parser normalizes away (confusable or invalid input) fail the
/// construction and surface as a 500.
fn build_redirect_url(url: &Url, target_host: &str) -> Option<Url> {
    let mut redirected = url.clone();
    redirected.set_host(Some(target_host)).ok()?;

    // Delete the test-only query parameters to avoid infinite redirects.
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "redirectToHost" && key != "redirectIfRange")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if remaining.is_empty() {
        redirected.set_query(None);
    } else {
        redirected
            .query_pairs_mut()
            .clear()
            .extend_pairs(remaining);
    }

    if redirected.host_str() != Some(target_host) {
        return None;
    }
    Some(redirected)
}
