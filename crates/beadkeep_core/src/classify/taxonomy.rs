//! Module and theme taxonomy for tracker label backfill.
//!
//! Module labels (`mod:<name>`) name the subproject a record belongs to;
//! theme labels (`theme:<name>`) name the kind of work.

use crate::classify::rules::{BracketTable, RuleTable};
use crate::model::record::Record;
use once_cell::sync::Lazy;
use std::collections::BTreeSet;

const BRACKET_ENTRIES: &[(&str, Option<&str>)] = &[
    ("clavain", Some("mod:clavain")),
    ("intercore", Some("mod:intercore")),
    ("intermute", Some("mod:intermute")),
    ("autarch", Some("mod:autarch")),
    ("intercom", Some("mod:intercom")),
    ("interspect", Some("mod:interspect")),
    ("interverse", Some("mod:interverse")),
    ("interflux", Some("mod:interflux")),
    ("interkasten", Some("mod:interkasten")),
    ("interlock", Some("mod:interlock")),
    ("intermap", Some("mod:intermap")),
    ("interpath", Some("mod:interpath")),
    ("interwatch", Some("mod:interwatch")),
    ("interject", Some("mod:interject")),
    ("intermem", Some("mod:intermem")),
    ("interbase", Some("mod:interbase")),
    ("intercache", Some("mod:intercache")),
    ("interform", Some("mod:interform")),
    ("interline", Some("mod:interline")),
    ("interpeer", Some("mod:interpeer")),
    ("intersearch", Some("mod:intersearch")),
    ("interpub", Some("mod:interpub")),
    ("interphase", Some("mod:interphase")),
    ("interdev", Some("mod:interdev")),
    ("interserve", Some("mod:interserve")),
    ("interdoc", Some("mod:interdoc")),
    ("intership", Some("mod:intership")),
    ("internext", Some("mod:internext")),
    ("intertest", Some("mod:intertest")),
    ("interslack", Some("mod:interslack")),
    ("interlens", Some("mod:interlens")),
    ("intermux", Some("mod:intermux")),
    ("interfluence", Some("mod:interfluence")),
    ("intersynth", Some("mod:intersynth")),
    ("intercraft", Some("mod:intercraft")),
    ("tldrs", Some("mod:tldrs")),
    ("tldr-swinton", Some("mod:tldrs")),
    ("flux-drive", Some("mod:interflux")),
    ("flux-drive-spec", Some("mod:interflux")),
    ("coldwine", Some("mod:autarch")),
    ("gurgeh", Some("mod:autarch")),
    ("bigend", Some("mod:autarch")),
    ("pollard", Some("mod:autarch")),
    // Recovery markers and umbrella tokens carry no module.
    ("recovered-doc", None),
    ("recovered", None),
    ("roadmap-recovery", None),
    ("vision", None),
];

const MODULE_KEYWORDS: &[(&str, &str)] = &[
    (r"\bclavain\b", "mod:clavain"),
    (r"\bintercore\b", "mod:intercore"),
    (r"\bintermute\b", "mod:intermute"),
    (r"\bautarch\b", "mod:autarch"),
    (r"\bcoldwine\b", "mod:autarch"),
    (r"\bgurgeh\b", "mod:autarch"),
    (r"\bbigend\b", "mod:autarch"),
    (r"\bpollard\b", "mod:autarch"),
    (r"\bintercom\b", "mod:intercom"),
    (r"\binterspect\b", "mod:interspect"),
    (r"\binterverse\b", "mod:interverse"),
    (r"\binterflux\b", "mod:interflux"),
    (r"\bflux-drive\b", "mod:interflux"),
    (r"\binterkasten\b", "mod:interkasten"),
    (r"\binterlock\b", "mod:interlock"),
    (r"\bintermap\b", "mod:intermap"),
    (r"\binterpath\b", "mod:interpath"),
    (r"\binterwatch\b", "mod:interwatch"),
    (r"\binterject\b", "mod:interject"),
    (r"\bintermem\b", "mod:intermem"),
    (r"\binterbase\b", "mod:interbase"),
    (r"\bintercache\b", "mod:intercache"),
    (r"\binterform\b", "mod:interform"),
    (r"\binterline\b", "mod:interline"),
    (r"\binterpeer\b", "mod:interpeer"),
    (r"\bintersearch\b", "mod:intersearch"),
    (r"\binterpub\b", "mod:interpub"),
    (r"\binterphase\b", "mod:interphase"),
    (r"\binterdev\b", "mod:interdev"),
    (r"\binterserve\b", "mod:interserve"),
    (r"\binterdoc\b", "mod:interdoc"),
    (r"\bintership\b", "mod:intership"),
    (r"\binternext\b", "mod:internext"),
    (r"\bintertest\b", "mod:intertest"),
    (r"\binterslack\b", "mod:interslack"),
    (r"\binterlens\b", "mod:interlens"),
    (r"\bintermux\b", "mod:intermux"),
    (r"\binterfluence\b", "mod:interfluence"),
    (r"\bintersynth\b", "mod:intersynth"),
    (r"\bintercraft\b", "mod:intercraft"),
    (r"\btldrs\b", "mod:tldrs"),
    (r"\btldr-swinton\b", "mod:tldrs"),
    (r"\bIronClaw\b", "mod:intercom"),
    (r"\bbeads\b", "mod:demarch"),
    (r"\bmonorepo\b", "mod:demarch"),
    (r"\binstall\.sh\b", "mod:demarch"),
    (r"\bic publish\b", "mod:demarch"),
];

const THEME_PATTERNS: &[(&str, &str)] = &[
    (
        r"\btech.?debt\b|\brefactor\b|\bcleanup\b|\bdeprecate\b|\blegacy\b|\bdead code\b|\bshellcheck\b|\bharden\b",
        "theme:tech-debt",
    ),
    (
        r"\bperf\b|\bperformance\b|\boptimi[sz]\b|\blatency\b|\bthroughput\b|\bbottleneck\b|\bcache\b|\bpre-filter\b|\btoken.?effici\b",
        "theme:performance",
    ),
    (
        r"\bsecur\b|\bsecret.?scan\b|\bcredential\b|\bauth\b|\btrust\b|\bpermission\b|\baccess.?control\b|\bsandbox\b|\bgitleaks\b|\bwaiver\b",
        "theme:security",
    ),
    (
        r"\bux\b|\bonboarding\b|\btui\b|\bdashboard\b|\bsidebar\b|\bui\b|\bdisplay\b|\bvisual\b|\bprogressive.?disclos\b",
        "theme:ux",
    ),
    (
        r"\bobservab\b|\blogging\b|\btrac(?:e|ing)\b|\bmetric\b|\bmonitor\b|\btelemetry\b|\bheartbeat\b|\bdiagnostic\b",
        "theme:observability",
    ),
    (
        r"\bdeveloper.?exp\b|\bdx\b|\bcli\b|\bskill\b|\bhook\b|\bplugin\b|\bscaffold\b|\btemplate\b|\bboilerplate\b|\bsetup\b|\binstall\b",
        "theme:dx",
    ),
    (
        r"\bci\b|\bcd\b|\bbuild\b|\bdeploy\b|\bgithub.?action\b|\bdependabot\b|\bworkflow\b|\brelease\b|\bpipeline\b|\bsystemd\b",
        "theme:infra",
    ),
    (
        r"\bdoc(?:s|umentation)\b|\bagents\.md\b|\bclaude\.md\b|\breadme\b|\bguide\b|\bchangelog\b",
        "theme:docs",
    ),
    (
        r"\btest\b|\btdd\b|\bcoverage\b|\bregression\b|\bsmoke.?test\b|\bintegration.?test\b|\bunit.?test\b|\bbenchmark\b",
        "theme:testing",
    ),
    (
        r"\barchitect\b|\bmodule.?boundar\b|\bdecompos\b|\bmigrat(?:e|ion)\b|\breplatform\b|\bschema\b|\bkernel\b|\bevent.?sourc\b",
        "theme:architecture",
    ),
    (
        r"\bcoordinat\b|\bmulti.?agent\b|\borch(?:estrat|estr)\b|\bdispatch\b|\breservation\b|\bclaiming\b|\bbroadcast\b|\bmessag(?:e|ing)\b|\bagent.?mail\b",
        "theme:coordination",
    ),
    (
        r"\bresearch\b|\bbrainstorm\b|\bexplor\b|\bprototype\b|\bspike\b|\bpoc\b|\bexperiment\b",
        "theme:research",
    ),
];

/// Bracket-prefix table for module detection.
pub static MODULE_BRACKETS: Lazy<BracketTable> = Lazy::new(|| BracketTable::new(BRACKET_ENTRIES));

/// Keyword table for module detection.
pub static MODULE_RULES: Lazy<RuleTable> =
    Lazy::new(|| RuleTable::compile(MODULE_KEYWORDS).expect("valid module keyword table"));

/// Keyword table for theme detection.
pub static THEME_RULES: Lazy<RuleTable> =
    Lazy::new(|| RuleTable::compile(THEME_PATTERNS).expect("valid theme pattern table"));

/// Module labels from `[token]` prefixes in `title` plus keywords anywhere.
pub fn detect_modules(title: &str, description: &str) -> BTreeSet<String> {
    let mut modules = MODULE_BRACKETS.classify(title);
    modules.extend(MODULE_RULES.classify(&format!("{title} {description}")));
    modules
}

/// Theme labels from keywords in title and description.
pub fn detect_themes(title: &str, description: &str) -> BTreeSet<String> {
    THEME_RULES.classify(&format!("{title} {description}"))
}

/// Full desired label set for one record.
pub fn classify_record(record: &Record) -> BTreeSet<String> {
    let text = record.classification_text();
    let mut labels = MODULE_BRACKETS.classify(&record.title);
    labels.extend(MODULE_RULES.classify(&text));
    labels.extend(THEME_RULES.classify(&text));
    labels
}
