#[path = "generated/mod.rs"]
mod templates;

use std::path::{Path, PathBuf};
use temporize::build::{output, pipeline, template_file};
use temporize::{Compiler, Template};
use templates::Page;
use templates::page::temporize::Temporize;
use templates::parts::Nav;

fn fixture_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join(name)
}

/// tests/generated 由 tests/templates 生成；设置 TEMPORIZE_BLESS 时重新写入
#[test]
#[ntest::timeout(5000)]
fn checked_in_output_matches_generator() {
    let compiler = Compiler::default();
    let output_dir = fixture_dir("generated");
    let files = template_file::discover(&fixture_dir("templates"), compiler.keywords()).unwrap();
    let compiled = pipeline::compile_batch(&files, &compiler).unwrap();
    pipeline::validate(&compiled, &output_dir).unwrap();
    let plan = output::plan(&compiled, &output_dir);

    if std::env::var_os("TEMPORIZE_BLESS").is_some() {
        output::persist(&plan, &output_dir, false).unwrap();
    }

    assert_eq!(plan.files.len(), 4);
    for file in &plan.files {
        let on_disk = std::fs::read_to_string(&file.path).unwrap();
        assert_eq!(on_disk, file.contents, "{} is out of date", file.path.display());
    }
}

#[test]
#[ntest::timeout(5000)]
fn generated_types_render() {
    let page = Page::new()
        .with_title("A & B")
        .with_nav(Nav::new().with_slug("hello world").with_label("Home"))
        .with_temporize(vec![
            Temporize::new().with_name("one").with_active(true),
            Temporize::new().with_name("two"),
        ])
        .with_inner(Page::new().with_title("x"));

    assert_eq!(
        page.render_to_string(),
        "<h1>A &amp; B</h1>\n\
         <nav><a href=\"/hello+world\">Home</a></nav>\n\
         \n<ul><li>ONE *</li><li>TWO</li></ul>\n\
         -\n\
         <h1>x</h1>\n\n<ul></ul>\n-\n\n\
         \n"
    );
    assert_eq!(page.to_string(), page.render_to_string());
}

#[test]
#[ntest::timeout(5000)]
fn conditional_takes_string_branch() {
    let page = Page::new().with_note("<b>");
    assert_eq!(
        page.render_to_string(),
        "<h1></h1>\n\n<ul></ul>\n<p class=\"note\"><b></p>\n\n"
    );
}
