//! Instructions sent with each screenshot.

use crate::scoring::ScoringMode;

const RACE_PROMPT: &str = "This is the result screen of a 12-player team race. \
Read every row from top to bottom. For each player return an object with \
\"rank\" (integer finishing position, 1-12), \"name\" (player name exactly as shown), \
\"team\" (team tag exactly as shown) and \"isCurrentPlayer\" (true only for the \
highlighted row of the player running this tool).";

const RACE_PROMPT_NO_TEAM: &str = "This is the result screen of a 12-player team race. \
Read every row from top to bottom. For each player return an object with \
\"rank\" (integer finishing position, 1-12), \"name\" (player name exactly as shown, \
including any team tag at the start) and \"isCurrentPlayer\" (true only for the \
highlighted row of the player running this tool). Do not guess teams.";

const OVERALL_PROMPT: &str = "This screen shows the running team totals. \
For each row return an object with \"name\" (player or team name as shown), \
\"team\" (team tag), \"totalScore\" (the cumulative score as an integer) and \
\"isCurrentPlayer\" (true only for the highlighted row).";

const OUTPUT_RULES: &str = "Reply with JSON only, no commentary: \
{\"results\": [ ... ]}. If the image is not a result screen, reply \
{\"error\": \"<short reason>\"}.";

/// Builds the prompt for a scoring mode.
pub fn prompt_for(mode: ScoringMode, infer_teams: bool) -> String {
    let body = match (mode, infer_teams) {
        (ScoringMode::Race, false) => RACE_PROMPT,
        (ScoringMode::Race, true) => RACE_PROMPT_NO_TEAM,
        (ScoringMode::Overall, _) => OVERALL_PROMPT,
    };
    format!("{}\n\n{}", body, OUTPUT_RULES)
}
