//! Job detail page.

use hydra_sdk::hydra_render::{component, el, Component, ErrorBoundary, Node, Query, RenderError, RenderScope};

use super::styles;
use crate::data::Job;

pub fn job_detail(cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
    let job = match cx.route_data::<Job>() {
        Query::Ready(job) => job,
        Query::Failed(message) => {
            let muted = cx.style(&styles::muted());
            return Ok(el("p")
                .class(muted)
                .child(format!("Job unavailable: {}", message))
                .into());
        }
        Query::Missing => return Ok(Node::Empty),
    };

    let badge = cx.style(&styles::job_badge(job.state));
    let muted = cx.style(&styles::muted());
    let logs = ErrorBoundary::new(
        component(job_logs),
        el("p").class(muted).child("Logs unavailable").into(),
    )
    .render(cx)?;

    Ok(el("section")
        .attr("data-job", job.id.as_str())
        .child(el("h1").child(job.title.as_str()))
        .child(el("p").child(el("span").class(badge).child(job.state.label())))
        .child(
            el("a")
                .attr("href", format!("/agents/{}", job.agent_id))
                .child("Back to agent"),
        )
        .child(el("h2").child("Logs"))
        .child(logs)
        .into())
}

/// Fails once the job's logs have expired.
fn job_logs(cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
    let lines = cx
        .route_data::<Job>()
        .ready()
        .and_then(|job| job.logs)
        .ok_or_else(|| RenderError::component("JobLogs", "logs expired"))?;

    let class = cx.style(&styles::logs());
    Ok(el("pre")
        .class(class)
        .child(lines.join("\n"))
        .into())
}
