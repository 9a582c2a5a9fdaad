//! Renderers for each generated file. All pure; same input, same bytes.

use std::collections::BTreeMap;
use std::fmt::Write;

use routine_core::{CriticRule, ObserverSpec, PlannedStep, Result, RoutinePlan, Severity};
use serde_json::{json, Value};

use crate::registry::{ResolvedTools, ToolBinding};

pub const STEPS_FILE: &str = "steps.json";
pub const WORKFLOW_FILE: &str = "workflow.rs";
pub const CRITICS_FILE: &str = "critics.rs";
pub const OBSERVER_FILE: &str = "observer.rs";
pub const MOD_FILE: &str = "mod.rs";
pub const AGENTS_FILE: &str = "agents.json";
pub const ENV_FILE: &str = ".env.example";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const README_FILE: &str = "README.md";

/// Rust string literal for `text`.
fn lit(text: &str) -> String {
    format!("{:?}", text)
}

/// Collapse text onto one line for use in a comment.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Names the generated workflow binds itself. A tool symbol spelled like
/// one of these is called by its full path instead of imported.
const RESERVED_NAMES: [&str; 27] = [
    "Arc", "CriticRule", "CriticSet", "Map", "RunError", "RunOutcome", "Runtime", "Severity",
    "StepInfo", "StubObserver", "Tool", "ToolContext", "ToolError", "Value", "Ok", "Err", "Some",
    "None", "Result", "String", "critics", "observer", "run", "rt", "step", "inputs", "result",
];

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name != "_"
}

/// `use` groups for bound tools and the callee each tool id gets.
#[derive(Debug, Default)]
struct ToolImports {
    /// Module path with its symbols, both in first-appearance order.
    groups: Vec<(String, Vec<String>)>,
    callees: BTreeMap<String, String>,
}

impl ToolImports {
    fn new(tools: &ResolvedTools) -> Self {
        let mut imports = Self::default();
        let mut taken: BTreeMap<&str, &str> = BTreeMap::new();
        for binding in &tools.bound {
            let symbol = binding.symbol_name.as_str();
            let module = binding.module_path.as_str();
            let free = taken.get(symbol).map_or(true, |owner| *owner == module);
            if !free || !is_identifier(symbol) || RESERVED_NAMES.contains(&symbol) {
                imports.callees.insert(binding.id.clone(), binding.path());
                continue;
            }
            if taken.insert(symbol, module).is_none() {
                match imports.groups.iter_mut().find(|(path, _)| path == module) {
                    Some((_, symbols)) => symbols.push(symbol.to_string()),
                    None => imports.groups.push((module.to_string(), vec![symbol.to_string()])),
                }
            }
            imports.callees.insert(binding.id.clone(), symbol.to_string());
        }
        imports
    }

    fn write_uses(&self, out: &mut String) {
        for (module, symbols) in &self.groups {
            match symbols.as_slice() {
                [single] => {
                    let _ = writeln!(out, "use {}::{};", module, single);
                }
                _ => {
                    let _ = writeln!(out, "use {}::{{{}}};", module, symbols.join(", "));
                }
            }
        }
    }

    fn call(&self, binding: &ToolBinding, inputs_expr: &str) -> String {
        match self.callees.get(&binding.id) {
            Some(callee) => binding.invoke_as(callee, inputs_expr),
            None => binding.invoke(inputs_expr),
        }
    }
}

/// `steps.json`: the flattened plan.
pub fn steps_json(plan: &RoutinePlan) -> Result<String> {
    Ok(serde_json::to_string_pretty(plan)? + "\n")
}

/// `workflow.rs`: one unrolled block per step.
pub fn workflow_rs(
    title: &str,
    plan: &RoutinePlan,
    tools: &ResolvedTools,
    runtime_crate: &str,
) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "//! Generated workflow: {}", one_line(title));
    let _ = writeln!(out, "//!");
    let _ = writeln!(out, "//! Runs the routine plan step by step on `{}`.", runtime_crate);
    out.push('\n');
    out.push_str("#![allow(unused_imports, unused_variables)]\n\n");
    out.push_str("use std::sync::Arc;\n\n");
    let _ = writeln!(out, "use {}::prelude::*;", runtime_crate);
    out.push('\n');
    out.push_str("use super::critics;\nuse super::observer;\n");
    let imports = ToolImports::new(tools);
    imports.write_uses(&mut out);
    out.push('\n');

    out.push_str("/// Run the routine. `seeds` pre-populate the run context.\n");
    out.push_str("pub async fn run(seeds: Map<String, Value>) -> Result<RunOutcome, RunError> {\n");
    out.push_str("    let mut rt = Runtime::new(seeds, critics::critic_set())\n");
    out.push_str("        .with_hooks(Arc::new(observer::observer()));\n");
    out.push_str("    rt.start().await;\n");

    for step in plan {
        out.push('\n');
        render_step(&mut out, step, tools, &imports)?;
    }

    out.push_str("\n    Ok(rt.finish().await)\n}\n");
    Ok(out)
}

fn render_step(
    out: &mut String,
    step: &PlannedStep,
    tools: &ResolvedTools,
    imports: &ToolImports,
) -> Result<()> {
    let _ = write!(out, "    // Step {}: {}", step.id, one_line(&step.tool));
    if let Some(description) = &step.description {
        let _ = write!(out, " ({})", one_line(description));
    }
    out.push('\n');
    out.push_str("    {\n");
    let _ = writeln!(
        out,
        "        let step = StepInfo::new({}, {}, {});",
        step.id,
        lit(&step.tool),
        lit(&step.agent)
    );
    out.push_str("        rt.before_step(&step).await;\n");

    let inputs_json = serde_json::to_string(&step.inputs)?;
    let _ = writeln!(
        out,
        "        let inputs = rt.resolve(&Runtime::literal({}));",
        lit(&inputs_json)
    );

    let call = match tools.get(&step.tool) {
        Some(binding) => format!("rt.invoke(&step, {}).await?", imports.call(binding, "inputs")),
        None => {
            let _ = writeln!(out, "        // No binding for tool {:?}.", step.tool);
            "rt.not_implemented(&step)".to_string()
        }
    };

    match &step.condition {
        Some(condition) => {
            let _ = writeln!(
                out,
                "        let result = if rt.condition(&step, {}) {{",
                lit(condition)
            );
            let _ = writeln!(out, "            {}", call);
            out.push_str("        } else {\n");
            out.push_str("            Value::Null\n");
            out.push_str("        };\n");
        }
        None => {
            let _ = writeln!(out, "        let result = {};", call);
        }
    }

    let outputs: Vec<String> = step.outputs.iter().map(|name| lit(name)).collect();
    let _ = writeln!(
        out,
        "        rt.record_outputs(step.id, &[{}], &result);",
        outputs.join(", ")
    );
    out.push_str("        rt.run_critics(&step, &result)?;\n");
    out.push_str("        rt.after_step(&step, &result).await;\n");
    out.push_str("    }\n");
    Ok(())
}

/// `critics.rs`: the rule list as builder calls.
pub fn critics_rs(rules: &[CriticRule], runtime_crate: &str) -> String {
    let mut out = String::new();
    out.push_str("//! Generated critic rules.\n//!\n");
    out.push_str("//! Each `when` is a boolean expression over run-context references and\n");
    out.push_str("//! `result`. Severity `Error` aborts the run; `Warn` logs and continues.\n\n");
    let _ = writeln!(out, "use {}::prelude::*;", runtime_crate);
    out.push('\n');

    out.push_str("/// Rules extracted from the planner's critic agents.\n");
    out.push_str("pub fn rules() -> Vec<CriticRule> {\n");
    if rules.is_empty() {
        out.push_str("    Vec::new()\n");
    } else {
        out.push_str("    vec![\n");
        for rule in rules {
            let mut lines = vec![format!(
                "        CriticRule::new({}, {})",
                lit(&rule.id),
                lit(&rule.name)
            )];
            if let Some(when) = &rule.when {
                lines.push(format!("            .when({})", lit(when)));
            }
            if rule.severity == Severity::Error {
                lines.push("            .severity(Severity::Error)".to_string());
            }
            if let Some(action) = &rule.action {
                lines.push(format!("            .action({})", lit(action)));
            }
            if let Some(description) = &rule.description {
                lines.push(format!("            .description({})", lit(description)));
            }
            out.push_str(&lines.join("\n"));
            out.push_str(",\n");
        }
        out.push_str("    ]\n");
    }
    out.push_str("}\n\n");

    out.push_str("pub fn critic_set() -> CriticSet {\n");
    out.push_str("    CriticSet::new(rules())\n");
    out.push_str("}\n");
    out
}

/// `observer.rs`: a stub seeded from the observer spec.
pub fn observer_rs(spec: Option<&ObserverSpec>, runtime_crate: &str) -> String {
    let empty = ObserverSpec::default();
    let spec = spec.unwrap_or(&empty);

    let mut out = String::new();
    out.push_str("//! Generated observer stub. Swap in a real telemetry sink as needed.\n\n");
    let _ = writeln!(out, "use {}::prelude::*;", runtime_crate);
    out.push('\n');
    out.push_str("pub fn observer() -> StubObserver {\n");
    out.push_str("    StubObserver::builder()\n");
    for name in &spec.counters {
        let _ = writeln!(out, "        .counter({})", lit(name));
    }
    for name in &spec.gauges {
        let _ = writeln!(out, "        .gauge({})", lit(name));
    }
    for name in &spec.events {
        let _ = writeln!(out, "        .event({})", lit(name));
    }
    out.push_str("        .build()\n");
    out.push_str("}\n\n");

    out.push_str("// Notes from planner:\n");
    let notes = spec.notes.trim();
    if notes.is_empty() {
        out.push_str("// (none)\n");
    } else {
        for line in notes.lines().map(one_line) {
            if line.is_empty() {
                out.push_str("//\n");
            } else {
                let _ = writeln!(out, "// {}", line);
            }
        }
    }
    out
}

/// `mod.rs`: wires the three generated sources together.
pub fn mod_rs(title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "//! Generated routine template: {}\n", one_line(title));
    out.push_str("pub mod critics;\npub mod observer;\npub mod workflow;\n\n");
    out.push_str("pub use workflow::run;\n");
    out
}

/// `agents.json`: planner output as received.
pub fn agents_json(agents: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(agents)? + "\n")
}

/// `.env.example`: one `KEY=value` line per variable.
pub fn env_example(variables: &BTreeMap<String, String>) -> String {
    let mut out = String::from("# Variables supplied at compile time\n");
    for (key, value) in variables {
        let _ = writeln!(out, "{}={}", one_line(key), one_line(value));
    }
    out
}

/// What the manifest records.
pub struct ManifestFields<'a> {
    pub title: &'a str,
    pub files: &'a [String],
    pub step_count: usize,
    pub tools: &'a ResolvedTools,
    pub rule_count: usize,
    pub observer: bool,
    /// Digest of every file except the manifest itself.
    pub content_digest: &'a str,
}

/// `manifest.json`.
pub fn manifest_json(fields: &ManifestFields<'_>) -> Result<String> {
    let manifest = json!({
        "title": fields.title,
        "files": fields.files,
        "steps": fields.step_count,
        "bound_tools": fields.tools.bound_ids(),
        "unbound_tools": fields.tools.unbound,
        "rules": fields.rule_count,
        "observer": fields.observer,
        "content_digest": fields.content_digest,
    });
    Ok(serde_json::to_string_pretty(&manifest)? + "\n")
}

fn describe(path: &str) -> &'static str {
    match path {
        STEPS_FILE => "flattened step list",
        WORKFLOW_FILE => "step-by-step runner over the routine runtime",
        CRITICS_FILE => "guardrail rules from the planner (edit as needed)",
        OBSERVER_FILE => "telemetry stub",
        MOD_FILE => "module wiring",
        AGENTS_FILE => "planner output as received",
        ENV_FILE => "variables supplied at compile time",
        MANIFEST_FILE => "file list, tools and digest",
        README_FILE => "this file",
        _ => "",
    }
}

/// `README.md`.
pub fn readme_md(
    title: &str,
    files: &[String],
    plan: &RoutinePlan,
    tools: &ResolvedTools,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", one_line(title));
    out.push_str("Generated from a routine plan.\n\n## Files\n\n");
    for path in files {
        let _ = writeln!(out, "- `{}` - {}", path, describe(path));
    }

    out.push_str("\n## Steps\n\n");
    for step in plan {
        let _ = write!(out, "{}. `{}` ({})", step.id, one_line(&step.tool), one_line(&step.agent));
        if let Some(condition) = &step.condition {
            let _ = write!(out, " when `{}`", one_line(condition));
        }
        out.push('\n');
    }

    if !tools.unbound.is_empty() {
        out.push_str("\n## Unbound tools\n\n");
        out.push_str("These steps record a `not_implemented` result until a binding exists:\n\n");
        for id in &tools.unbound {
            let _ = writeln!(out, "- `{}`", one_line(id));
        }
    }
    out
}
