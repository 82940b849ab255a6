//! Package graph listing

use anyhow::{Context, Result};
use rbgo_build::Package;
use std::path::Path;

pub fn run(path: &Path, config_file: Option<&Path>, json: bool) -> Result<()> {
    let config = super::load_config(path, config_file)?;
    let workspace = super::open_workspace(path, &config)?;
    let repo = workspace.lock();
    let packages: Vec<&Package> = repo.all().collect();

    if json {
        let text = serde_json::to_string_pretty(&packages).context("Failed to encode packages")?;
        println!("{}", text);
        return Ok(());
    }

    for package in packages {
        print!("{}", render(package));
    }
    Ok(())
}

fn render(package: &Package) -> String {
    let mut out = format!("{}\n", package.full_name);
    out.push_str(&format!("  watch:    {}\n", package.watch_path.display()));
    out.push_str(&format!("  object:   {}\n", package.object_path.display()));
    if package.in_vendor {
        out.push_str(&format!("  project:  {}\n", package.project_name));
    }
    for import in &package.imports {
        out.push_str(&format!("  import:   {}\n", import));
    }
    for referrer in &package.referrers {
        out.push_str(&format!("  referrer: {}\n", referrer.display()));
    }
    for missing in &package.missing_imports {
        out.push_str(&format!("  missing:  {}\n", missing));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbgo_build::SourceLayout;

    #[test]
    fn test_render_lists_edges() {
        let mut package = Package::new(SourceLayout::new("/ws/src", "pkg"), "/ws/src/app");
        package.full_name = "app".to_string();
        package.object_path = "/ws/pkg/app.a".into();
        package.imports = vec!["lib".to_string()];
        package.missing_imports = vec!["gone".to_string()];

        let text = render(&package);
        assert!(text.starts_with("app\n"));
        assert!(text.contains("  import:   lib\n"));
        assert!(text.contains("  missing:  gone\n"));
        assert!(!text.contains("project:"));
    }
}
