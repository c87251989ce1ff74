use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Ballot ids for sources that do not carry one: `<file name>-<line number>`.
pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ids_use_the_file_name() {
        let id = make_default_id("/data/ballots/ward3.csv");
        assert_eq!(id(12), "ward3.csv-00000012");
        assert_eq!(simplify_file_name("plain"), "plain");
    }
}
