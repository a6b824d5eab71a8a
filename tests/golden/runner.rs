use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use storysave_common::csf::CsfFile;
use storysave_common::protocol::story::SaveStoryPayload;

#[derive(Debug)]
struct GoldenCase {
    name: String,
    before: String,
    after: String,
    request: SaveStoryPayload,
}

#[test]
fn story_edit_golden_cases() {
    let cases_dir = golden_cases_dir();
    let cases = load_cases(&cases_dir);

    assert!(!cases.is_empty(), "no golden cases found in {}", cases_dir.display());

    let mut failures = Vec::new();
    for case in cases {
        if let Err(message) = run_case(&case) {
            failures.push(message);
        }
    }

    if !failures.is_empty() {
        panic!("{} golden case(s) failed:\n\n{}", failures.len(), failures.join("\n\n"));
    }
}

fn golden_cases_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tests/golden/cases")
}

fn load_cases(cases_dir: &Path) -> Vec<GoldenCase> {
    let mut case_dirs: Vec<PathBuf> = fs::read_dir(cases_dir)
        .unwrap_or_else(|error| panic!("failed to read {}: {error}", cases_dir.display()))
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if path.is_dir() {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    case_dirs.sort();
    case_dirs.into_iter().map(load_case).collect()
}

fn load_case(case_dir: PathBuf) -> GoldenCase {
    let name = case_dir
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("<unnamed-case>")
        .to_owned();

    let before = read_required(&case_dir.join("before.stories.tsx"));
    let after = read_required(&case_dir.join("after.stories.tsx"));
    let request_path = case_dir.join("request.json");
    let request = serde_json::from_str::<SaveStoryPayload>(&read_required(&request_path))
        .unwrap_or_else(|error| {
            panic!("failed to parse request in {}: {error}", request_path.display())
        });

    GoldenCase { name, before, after, request }
}

/// Apply a save request to `source` the way the daemon does: locate the story
/// by the key part of its id, duplicate it for save-as requests, then write
/// the args.
fn apply_request(request: &SaveStoryPayload, source: &str) -> Result<String, String> {
    let mut file = CsfFile::parse(&request.import_path, source)
        .map_err(|error| format!("parse failed: {error}"))?;
    let key = request.story_key().ok_or("request id has no story key")?;
    let suffix = format!("--{key}");

    let matches: Vec<String> = file
        .stories()
        .into_values()
        .filter(|record| record.generated_id.ends_with(&suffix))
        .map(|record| record.export_name)
        .collect();
    let [export_name] = matches.as_slice() else {
        return Err(format!("expected one story matching `{suffix}`, found {matches:?}"));
    };

    let target = match request.new_story_name() {
        Some(new_name) => file
            .duplicate_story(export_name, new_name)
            .map_err(|error| format!("duplicate failed: {error}"))?,
        None => file.story_target(export_name).ok_or("story target vanished")?,
    };
    file.apply_args(&target, &request.args).map_err(|error| format!("apply failed: {error}"))?;
    Ok(file.serialize())
}

fn run_case(case: &GoldenCase) -> Result<(), String> {
    let actual = apply_request(&case.request, &case.before)
        .map_err(|message| format!("case `{}`: {message}", case.name))?;

    if actual != case.after {
        return Err(format!(
            "case `{}` story file mismatch.\n{}",
            case.name,
            render_line_diff(&case.after, &actual)
        ));
    }

    // Saving the same args again must not change an updated story.
    if case.request.new_story_name().is_none() {
        let again = apply_request(&case.request, &actual)
            .map_err(|message| format!("case `{}` (second save): {message}", case.name))?;
        if again != actual {
            return Err(format!(
                "case `{}` is not stable under a repeated save.\n{}",
                case.name,
                render_line_diff(&actual, &again)
            ));
        }
    }

    // Every expected file already carries `args`, so an empty save is a no-op.
    let empty =
        SaveStoryPayload { args: Map::<String, Value>::new(), name: None, ..case.request.clone() };
    let untouched = apply_request(&empty, &case.after)
        .map_err(|message| format!("case `{}` (empty args): {message}", case.name))?;
    if untouched != case.after {
        return Err(format!(
            "case `{}` changed on an empty save.\n{}",
            case.name,
            render_line_diff(&case.after, &untouched)
        ));
    }

    Ok(())
}

fn render_line_diff(expected: &str, actual: &str) -> String {
    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    let max_len = expected_lines.len().max(actual_lines.len());

    let mut out = Vec::with_capacity(max_len);
    for index in 0..max_len {
        let expected_line = expected_lines.get(index).copied().unwrap_or("<none>");
        let actual_line = actual_lines.get(index).copied().unwrap_or("<none>");
        let marker = if expected_line == actual_line { " " } else { "!" };
        out.push(format!("{marker} {:>3} expected: {expected_line}\n        actual:   {actual_line}", index + 1));
    }
    out.join("\n")
}

fn read_required(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|error| panic!("failed to read {}: {error}", path.display()))
}
