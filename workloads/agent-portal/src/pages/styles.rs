//! Style rules used by the pages.

use hydra_sdk::hydra_render::StyleRule;

use crate::data::{AgentStatus, JobState};

pub fn shell() -> StyleRule {
    StyleRule::class("shell", "display:grid;grid-template-rows:auto 1fr;min-height:100vh")
}

pub fn nav() -> StyleRule {
    StyleRule::class("nav", "display:flex;gap:16px;padding:12px 24px;border-bottom:1px solid #e5e7eb")
}

pub fn content() -> StyleRule {
    StyleRule::class("content", "padding:24px;max-width:960px")
}

pub fn table() -> StyleRule {
    StyleRule::class("table", "width:100%;border-collapse:collapse")
}

pub fn muted() -> StyleRule {
    StyleRule::class("muted", "color:#6b7280")
}

pub fn logs() -> StyleRule {
    StyleRule::class("logs", "font-family:monospace;background:#111827;color:#f9fafb;padding:12px")
}

pub fn agent_badge(status: AgentStatus) -> StyleRule {
    match status {
        AgentStatus::Running => StyleRule::class("badge-running", "color:#065f46;background:#d1fae5"),
        AgentStatus::Idle => StyleRule::class("badge-idle", "color:#92400e;background:#fef3c7"),
        AgentStatus::Offline => StyleRule::class("badge-offline", "color:#374151;background:#e5e7eb"),
    }
}

pub fn job_badge(state: JobState) -> StyleRule {
    match state {
        JobState::Queued => StyleRule::class("badge-queued", "color:#1e40af;background:#dbeafe"),
        JobState::Running => StyleRule::class("badge-running", "color:#065f46;background:#d1fae5"),
        JobState::Succeeded => StyleRule::class("badge-succeeded", "color:#166534;background:#dcfce7"),
        JobState::Failed => StyleRule::class("badge-failed", "color:#991b1b;background:#fee2e2"),
    }
}
