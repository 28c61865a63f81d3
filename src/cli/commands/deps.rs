//! Deps command - print the transitive dependencies of a package

use crate::cli::args::DepsArgs;
use crate::error::BuildchainResult;
use crate::tree::DependencyTree;

/// Execute the deps command
pub async fn execute(args: DepsArgs) -> BuildchainResult<()> {
    let tree = DependencyTree::load(&args.tree)?;
    for line in closure_lines(&tree, &args.package) {
        println!("{}", line);
    }
    Ok(())
}

/// One package per line, sorted
fn closure_lines(tree: &DependencyTree, package: &str) -> Vec<String> {
    tree.flatten(package)
        .into_iter()
        .map(|name| name.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_closure_sorted() {
        let tree = DependencyTree::from_json(
            r#"{"atlas": ["eckit", "fckit"], "fckit": ["eckit"], "eckit": ["ecbuild"]}"#,
        )
        .unwrap();

        assert_eq!(closure_lines(&tree, "atlas"), vec!["ecbuild", "eckit", "fckit"]);
        assert!(closure_lines(&tree, "unknown").is_empty());
    }
}
