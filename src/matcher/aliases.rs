//! Pro-team alias table.
//!
//! Maps a ticker suffix (the exchange's team code) to lowercase
//! keywords that appear in feed team names or selections. Codes cover
//! the NBA, NFL, NHL, and MLB; a few codes are shared across leagues
//! (BOS is both the Celtics and the Red Sox and the Bruins), which is
//! why entries list every franchise using that code. College teams
//! have no entries and fall back to word matching.

/// Keywords for a ticker suffix. Empty for unknown (college) codes.
pub fn keywords(code: &str) -> &'static [&'static str] {
    match code {
        "NYK" => &["knicks", "new york k"],
        "HOU" => &["houston", "rockets", "astros"],
        "DET" => &["detroit", "pistons", "tigers", "red wings"],
        "CHI" => &["chicago", "bulls", "cubs", "blackhawks"],
        "SAS" => &["san antonio", "spurs"],
        "SAC" => &["sacramento", "kings"],
        "MEM" => &["memphis", "grizzlies"],
        "UTA" => &["utah", "jazz"],
        "MIL" => &["milwaukee", "bucks", "brewers"],
        "ATL" => &["atlanta", "hawks", "braves"],
        "PHI" => &["philadelphia", "76ers", "sixers", "phillies", "flyers"],
        "NOP" => &["new orleans", "pelicans"],
        "MIA" => &["miami", "heat", "marlins"],
        "BOS" => &["boston", "celtics", "red sox", "bruins"],
        "GSW" => &["golden state", "warriors"],
        "LAL" => &["lakers"],
        "LAC" => &["clippers"],
        "DEN" => &["denver", "nuggets", "rockies"],
        "MIN" => &["minnesota", "timberwolves", "twins", "wild"],
        "OKC" => &["oklahoma", "thunder"],
        "POR" => &["portland", "trail blazers"],
        "PHX" => &["phoenix", "suns"],
        "DAL" => &["dallas", "mavericks"],
        "IND" => &["indiana", "pacers"],
        "CLE" => &["cleveland", "cavaliers", "guardians"],
        "TOR" => &["toronto", "raptors", "blue jays", "maple leafs"],
        "BKN" => &["brooklyn", "nets"],
        "WAS" => &["washington", "wizards", "nationals", "capitals"],
        "CHA" => &["charlotte", "hornets"],
        "ORL" => &["orlando", "magic"],
        "NYY" => &["yankees"],
        "NYM" => &["mets"],
        "NYR" => &["rangers", "new york r"],
        "NYI" => &["islanders"],
        "NJD" => &["devils", "new jersey"],
        "CHC" => &["cubs"],
        "CWS" => &["white sox"],
        "LAD" => &["dodgers"],
        "LAA" => &["angels"],
        "SFG" => &["giants", "san francisco"],
        "SDP" => &["padres", "san diego"],
        "ATH" => &["athletics", "a's", "oakland"],
        "STL" => &["cardinals", "st. louis", "st louis", "blues"],
        "PIT" => &["pirates", "pittsburgh", "penguins"],
        "CIN" => &["reds", "cincinnati"],
        "KCR" => &["royals", "kansas city"],
        "SEA" => &["mariners", "seattle", "kraken"],
        "TEX" => &["rangers", "texas"],
        "BAL" => &["orioles", "baltimore"],
        "TBR" => &["rays", "tampa bay"],
        "WSN" => &["nationals"],
        "FLA" => &["marlins", "florida", "panthers"],
        "COL" => &["rockies", "colorado", "avalanche"],
        "AZ" => &["diamondbacks", "arizona"],
        "ARI" => &["diamondbacks", "arizona", "coyotes"],
        "WSH" => &["capitals"],
        "CAR" => &["hurricanes", "carolina"],
        "TBL" => &["lightning"],
        "CBJ" => &["blue jackets", "columbus"],
        "NSH" => &["predators", "nashville"],
        "WPG" => &["jets", "winnipeg"],
        "SJS" => &["sharks", "san jose"],
        "ANA" => &["ducks", "anaheim"],
        "LAK" => &["kings"],
        "VAN" => &["canucks", "vancouver"],
        "CGY" => &["flames", "calgary"],
        "EDM" => &["oilers", "edmonton"],
        "VGK" => &["golden knights", "vegas"],
        "MTL" => &["canadiens", "montreal"],
        "OTT" => &["senators", "ottawa"],
        "BUF" => &["sabres", "buffalo"],
        _ => &[],
    }
}

/// Does a lowercased team name match a ticker suffix?
///
/// Alias keywords first; otherwise the suffix itself must equal a
/// whole word of the team name. Substring matching here would let
/// "UTSA" claim "Tulsa", so word equality it is.
pub fn team_matches_suffix(team_lower: &str, suffix: &str) -> bool {
    if keywords(suffix)
        .iter()
        .any(|kw| team_lower.contains(kw))
    {
        return true;
    }
    let sfx_lower = suffix.to_lowercase();
    team_lower.split_whitespace().any(|w| w == sfx_lower)
}
