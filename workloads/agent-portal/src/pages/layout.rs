//! Page shell and the index/not-found pages.

use hydra_sdk::hydra_render::{el, Node, Query, RenderError, RenderScope};

use super::styles;
use crate::data::AgentSummary;

/// Shared layout: navigation plus the matched page.
pub fn layout(cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
    let shell = cx.style(&styles::shell());
    let nav = cx.style(&styles::nav());
    let content = cx.style(&styles::content());

    let agents_label = match cx.route_data::<Vec<AgentSummary>>() {
        Query::Ready(agents) => format!("Agents ({})", agents.len()),
        _ => "Agents".to_string(),
    };

    let page = cx.outlet()?;

    Ok(el("div")
        .class(shell)
        .child(
            el("nav")
                .class(nav)
                .child(el("a").attr("href", "/agents").child(agents_label)),
        )
        .child(el("main").class(content).child(page))
        .into())
}

/// `/` sends the user to the agent list.
pub fn home(cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
    Ok(cx.go_to("/agents"))
}

/// Rendered when no route matches.
pub fn not_found(cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
    let muted = cx.style(&styles::muted());
    Ok(el("section")
        .child(el("h1").child("Page not found"))
        .child(
            el("p")
                .class(muted)
                .child(el("a").attr("href", "/agents").child("Back to agents")),
        )
        .into())
}
