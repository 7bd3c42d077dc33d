//! Check command - dry classification of names
//!
//! Nothing on disk is read or changed; the configured grammars and
//! extension list are applied to the names given on the command line.

use crate::cli::output::{color_for_flag, print_table_colored};
use crate::cli::load_config;
use comfy_table::Color;
use scandrop::ingest::{classify, normalize, FileVerdict, NamingFlag, NamingGrammar};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug)]
pub struct CheckArgs {
    pub config: PathBuf,
    pub names: Vec<String>,
    pub folder: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct FileCheck {
    pub name: String,
    pub verdict: FileVerdict,
    /// Name the file would be given, when it would be flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged_as: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct FolderCheck {
    pub name: String,
    pub normalized: String,
    pub flag: NamingFlag,
}

pub fn check_file<S: AsRef<str>>(
    name: &str,
    supported_extensions: &[S],
    grammar: &NamingGrammar,
) -> FileCheck {
    let verdict = classify(name, supported_extensions, grammar);
    let stem = scandrop::ingest::validate::stem_of(name);
    FileCheck {
        name: name.to_string(),
        verdict,
        flagged_as: verdict
            .flag_prefix()
            .map(|prefix| format!("{}{}", prefix.as_str(), name)),
        fields: if verdict == FileVerdict::Valid {
            grammar.captures(stem).unwrap_or_default()
        } else {
            BTreeMap::new()
        },
    }
}

pub fn check_folder(name: &str, grammar: &NamingGrammar) -> FolderCheck {
    let (normalized, flag) = normalize(name, grammar);
    FolderCheck {
        name: name.to_string(),
        normalized,
        flag,
    }
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;

    if args.folder {
        let grammar = config.folder_grammar()?;
        let checks: Vec<FolderCheck> = args.names.iter().map(|n| check_folder(n, &grammar)).collect();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&checks)?);
            return Ok(());
        }
        let rows = checks
            .into_iter()
            .map(|c| {
                vec![
                    (c.name, None),
                    (c.normalized, None),
                    (c.flag.to_string(), Some(color_for_flag(c.flag))),
                ]
            })
            .collect();
        print_table_colored(&["Folder", "Normalized", "Flag"], rows);
        return Ok(());
    }

    let grammar = config.file_grammar()?;
    let checks: Vec<FileCheck> = args
        .names
        .iter()
        .map(|n| check_file(n, &config.supported_extensions, &grammar))
        .collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&checks)?);
        return Ok(());
    }
    let rows = checks
        .into_iter()
        .map(|c| {
            let color = match c.verdict {
                FileVerdict::Valid => Color::Green,
                FileVerdict::AlreadyFlagged => Color::Grey,
                FileVerdict::InvalidName | FileVerdict::UnsupportedExtension => Color::Yellow,
            };
            let detail = match (&c.flagged_as, c.fields.is_empty()) {
                (Some(flagged), _) => format!("-> {}", flagged),
                (None, false) => c
                    .fields
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(" "),
                (None, true) => String::new(),
            };
            vec![
                (c.name, None),
                (c.verdict.as_str().to_string(), Some(color)),
                (detail, None),
            ]
        })
        .collect();
    print_table_colored(&["File", "Verdict", "Detail"], rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scandrop::ingest::validate::DEFAULT_SUPPORTED_EXTENSIONS;

    #[test]
    fn valid_file_reports_fields() {
        let grammar = NamingGrammar::default_file();
        let check = check_file("2586_251231_Floor 1_Wing P.las", DEFAULT_SUPPORTED_EXTENSIONS, &grammar);
        assert_eq!(check.verdict, FileVerdict::Valid);
        assert_eq!(check.flagged_as, None);
        assert_eq!(check.fields["scope"], "Wing P");
    }

    #[test]
    fn invalid_files_report_their_flagged_name() {
        let grammar = NamingGrammar::default_file();
        let check = check_file("survey_data.las", DEFAULT_SUPPORTED_EXTENSIONS, &grammar);
        assert_eq!(check.flagged_as.as_deref(), Some("RENAME_survey_data.las"));

        let check = check_file("file.txt", DEFAULT_SUPPORTED_EXTENSIONS, &grammar);
        assert_eq!(check.flagged_as.as_deref(), Some("UNSUPPORTED_file.txt"));
        assert!(check.fields.is_empty());
    }

    #[test]
    fn folder_check_normalizes() {
        let grammar = NamingGrammar::default_folder();
        let check = check_folder("2586_Town Hall", &grammar);
        assert_eq!(check.normalized, "2586 Town Hall");
        assert_eq!(check.flag, NamingFlag::Ok);
    }
}
