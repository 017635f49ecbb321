//! Agent list and agent detail pages.

use hydra_sdk::hydra_render::{el, Node, Query, RenderError, RenderScope};

use super::styles;
use crate::data::{Agent, AgentSummary};

pub fn agent_list(cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
    let agents = match cx.route_data::<Vec<AgentSummary>>() {
        Query::Ready(agents) => agents,
        Query::Failed(message) => return Err(RenderError::component("AgentList", message)),
        Query::Missing => Vec::new(),
    };

    let table = cx.style(&styles::table());
    let mut rows: Vec<Node> = Vec::with_capacity(agents.len());
    for agent in &agents {
        let badge = cx.style(&styles::agent_badge(agent.status));
        rows.push(
            el("tr")
                .child(el("td").child(
                    el("a")
                        .attr("href", format!("/agents/{}", agent.id))
                        .child(agent.name.as_str()),
                ))
                .child(el("td").child(el("span").class(badge).child(agent.status.label())))
                .into(),
        );
    }

    Ok(el("section")
        .child(el("h1").child("Agents"))
        .child(el("table").class(table).children(rows))
        .into())
}

/// A missing agent fails the page; the server ships a degraded document
/// and the client renders it cold.
pub fn agent_detail(cx: &mut RenderScope<'_>) -> Result<Node, RenderError> {
    let agent = match cx.route_data::<Agent>() {
        Query::Ready(agent) => agent,
        Query::Failed(message) => return Err(RenderError::component("AgentDetail", message)),
        Query::Missing => {
            let muted = cx.style(&styles::muted());
            return Ok(el("p").class(muted).child("Loading agent").into());
        }
    };

    let badge = cx.style(&styles::agent_badge(agent.status));
    let muted = cx.style(&styles::muted());

    let mut jobs: Vec<Node> = Vec::with_capacity(agent.jobs.len());
    for job in &agent.jobs {
        let job_badge = cx.style(&styles::job_badge(job.state));
        jobs.push(
            el("li")
                .child(
                    el("a")
                        .attr("href", format!("/jobs/{}", job.id))
                        .child(job.title.as_str()),
                )
                .child(" ")
                .child(el("span").class(job_badge).child(job.state.label()))
                .into(),
        );
    }

    let jobs: Node = if jobs.is_empty() {
        el("p").class(muted.clone()).child("No jobs yet").into()
    } else {
        el("ul").children(jobs).into()
    };

    Ok(el("section")
        .attr("data-agent", agent.id.as_str())
        .child(el("h1").child(agent.name.as_str()))
        .child(
            el("p")
                .child(el("span").class(badge).child(agent.status.label()))
                .child(" ")
                .child(el("span").class(muted).child(agent.model.as_str())),
        )
        .child(el("h2").child("Jobs"))
        .child(jobs)
        .into())
}
