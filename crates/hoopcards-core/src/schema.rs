// Season stats document schema: source column names and their stored names.
//
// The source CSV (basketball-reference season export) uses terse column
// headers such as `TS%` or `Tm`. Documents are stored under the long names
// below, and every query issued by the card generator uses the long names.

/// Header of the unlabeled first column in the source CSV.
pub const SOURCE_ID_COLUMN: &str = "";

/// Document field holding the source row ordinal. Also used as document id.
pub const CSV_ID: &str = "csv_id";

/// Empty spacer columns present in the source export.
pub const PLACEHOLDER_COLUMNS: [&str; 2] = ["blanl", "blank2"];

/// Stored field for the player's name.
pub const PLAYER_FIELD: &str = "name";

/// Stored field for the season year.
pub const SEASON_FIELD: &str = "Season";

/// Stored field for the team abbreviation.
pub const TEAM_FIELD: &str = "Team";

/// Stored field for the listed position.
pub const POSITION_FIELD: &str = "Position";

/// Source column header -> stored field name.
pub const COLUMN_NAMES: &[(&str, &str)] = &[
    ("Year", "Season"),
    ("Player", "name"),
    ("Pos", "Position"),
    ("Age", "Age"),
    ("Tm", "Team"),
    ("G", "Games"),
    ("GS", "Games Started"),
    ("MP", "Minutes Played"),
    ("PER", "Player Efficiency Rating"),
    ("TS%", "True Shooting Percentage"),
    ("3PAr", "3-Point Attempt Rate"),
    ("FTr", "Free Throw Rate"),
    ("ORB%", "Offensive Rebound Percentage"),
    ("DRB%", "Defensive Rebound Percentage"),
    ("TRB%", "Total Rebound Percentage"),
    ("AST%", "Assist Percentage"),
    ("STL%", "Steal Percentage"),
    ("BLK%", "Block Percentage"),
    ("TOV%", "Turnover Percentage"),
    ("USG%", "Usage Percentage"),
    ("OWS", "Offensive Win Shares"),
    ("DWS", "Defensive Win Shares"),
    ("WS", "Win Shares"),
    ("WS/48", "Win Shares Per 48 Minutes"),
    ("OBPM", "Offensive Box Plus/Minus"),
    ("DBPM", "Defensive Box Plus/Minus"),
    ("BPM", "Box Plus/Minus"),
    ("VORP", "Value Over Replacement"),
    ("FG", "Field Goals"),
    ("FGA", "Field Goal Attempts"),
    ("FG%", "Field Goal Percentage"),
    ("3P", "3-Point Field Goals"),
    ("3PA", "3-Point Field Goal Attempts"),
    ("3P%", "3-Point Field Goal Percentage"),
    ("2P", "2-Point Field Goals"),
    ("2PA", "2-Point Field Goal Attempts"),
    ("2P%", "2-Point Field Goal Percentage"),
    ("eFG%", "Effective Field Goal Percentage"),
    ("FT", "Free Throws"),
    ("FTA", "Free Throw Attempts"),
    ("FT%", "Free Throw Percentage"),
    ("ORB", "Offensive Rebounds"),
    ("DRB", "Defensive Rebounds"),
    ("TRB", "Total Rebounds"),
    ("AST", "Assists"),
    ("STL", "Steals"),
    ("BLK", "Blocks"),
    ("TOV", "Turnovers"),
    ("PF", "Personal Fouls"),
    ("PTS", "Points"),
];

/// Look up the stored field name for a source column header.
pub fn long_name(column: &str) -> Option<&'static str> {
    COLUMN_NAMES
        .iter()
        .find(|(short, _)| *short == column)
        .map(|(_, long)| *long)
}

/// Stored field name for a source column, passing unknown headers through.
pub fn stored_field(column: &str) -> String {
    long_name(column).unwrap_or(column).to_string()
}
