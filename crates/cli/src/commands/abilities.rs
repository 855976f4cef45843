// Ability listing command

use anyhow::Result;
use serde::Serialize;
use stagerun_engine::AbilityRegistry;

use crate::output::{print_table_header, print_table_row, OutputFormat};

/// Ability info for structured output
#[derive(Debug, Clone, Serialize)]
pub struct AbilityInfo {
    pub name: String,
    pub description: String,
}

fn builtin_abilities() -> Vec<AbilityInfo> {
    AbilityRegistry::with_builtins()
        .list()
        .into_iter()
        .map(|ability| AbilityInfo {
            name: ability.name().to_string(),
            description: ability.description().to_string(),
        })
        .collect()
}

pub fn run(output: OutputFormat) -> Result<()> {
    let abilities = builtin_abilities();

    if output.is_text() {
        print_table_header(&[("NAME", 24), ("DESCRIPTION", 70)]);
        for ability in &abilities {
            print_table_row(&[(&ability.name, 24), (&ability.description, 70)]);
        }
    } else {
        output.print_value(&serde_json::json!({ "data": abilities, "total": abilities.len() }))?;
    }

    Ok(())
}
