use doc2epub::{Downloader, HttpFetcher, SiteConfig};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX: &str = r##"<!DOCTYPE html>
<html lang="zh-CN">
<head>
  <meta charset="utf-8" />
  <title>动手学深度学习</title>
  <link rel="stylesheet" href="_static/css/theme.css" type="text/css" />
  <link rel="stylesheet" href="_static/pygments.css" type="text/css" />
  <script type="text/javascript" src="_static/jquery.js"></script>
  <script type="text/javascript" src="https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.1/MathJax.js?config=TeX-AMS-MML_HTMLorMML"></script>
</head>
<body>
  <div role="main" class="document">
    <h1>动手学深度学习<a class="headerlink" href="#id1">¶</a></h1>
    <img src="_images/cover.png" />
    <div class="toctree-wrapper compound">
      <ul>
        <li class="toctree-l1"><a href="chapter_preface/index.html">前言</a>
          <ul>
            <li class="toctree-l2"><a href="chapter_preface/install.html">安装</a></li>
            <li class="toctree-l2"><a href="chapter_preface/index.html#notation">符号</a></li>
          </ul>
        </li>
        <li class="toctree-l1"><a href="chapter_missing/index.html">缺失</a></li>
      </ul>
    </div>
  </div>
  <script src="_static/google_analytics.js"></script>
  <script>jQuery(function () { SphinxRtdTheme.Navigation.enable(true); });</script>
</body>
</html>"##;

const PREFACE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <link rel="stylesheet" href="../_static/pygments.css" type="text/css" />
  <script type="text/javascript" src="../_static/jquery.js"></script>
  <script type="text/javascript" src="https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.1/MathJax.js?config=TeX-AMS-MML_HTMLorMML"></script>
</head>
<body>
  <div role="main">
    <h1>前言<a class="headerlink" href="#id1">¶</a></h1>
    <h2 id="notation">符号</h2>
    <img src="../_images/preface.jpg" />
    <img src="../_images/broken.png" />
  </div>
</body>
</html>"##;

const INSTALL: &str = r##"<!DOCTYPE html>
<html>
<head>
  <link rel="stylesheet" href="../_static/pygments.css?v=b3523f8e" type="text/css" />
  <script type="text/javascript" src="../_static/jquery.js"></script>
</head>
<body>
  <div role="main">
    <h1>安装¶</h1>
    <p>pip install mxnet</p>
    <script src="../_static/widget.js?v=9"></script>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/plot.js"></script>
    <script src="../_static/google_analytics.js"></script>
  </div>
</body>
</html>"##;

const NESTED_INDEX: &str = r##"<!DOCTYPE html>
<html>
<body>
  <div role="main">
    <h1>User Guide</h1>
    <div class="toctree-wrapper compound">
      <ul>
        <li class="toctree-l1"><a href="guide.html">Guide</a></li>
        <li class="toctree-l1"><a href="http://other.example.org/ext.html">Elsewhere</a></li>
      </ul>
    </div>
  </div>
</body>
</html>"##;

const GUIDE: &str = r##"<!DOCTYPE html>
<html><body><div role="main"><h1>Guide</h1></div></body></html>"##;

async fn serve(server: &MockServer, route: &str, status: u16, body: &[u8], content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", content_type)
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

async fn fake_site() -> MockServer {
    let server = MockServer::start().await;
    let html = "text/html; charset=utf-8";
    serve(&server, "/index.html", 200, INDEX.as_bytes(), html).await;
    serve(&server, "/chapter_preface/index.html", 200, PREFACE.as_bytes(), html).await;
    serve(&server, "/chapter_preface/install.html", 200, INSTALL.as_bytes(), html).await;
    serve(&server, "/chapter_missing/index.html", 404, b"", html).await;
    serve(&server, "/_static/pygments.css", 200, b".hll {}", "text/css").await;
    serve(&server, "/_static/jquery.js", 200, b"/* jquery */", "application/javascript").await;
    serve(&server, "/_static/widget.js", 200, b"/* widget */", "application/javascript").await;
    serve(&server, "/_static/google_analytics.js", 200, b"/* ga */", "application/javascript").await;
    serve(&server, "/_images/cover.png", 200, b"\x89PNG", "image/png").await;
    serve(&server, "/_images/preface.jpg", 200, b"\xff\xd8", "image/jpeg").await;
    serve(&server, "/_images/broken.png", 500, b"", "image/png").await;
    server
}

fn config_for(server: &MockServer, assets_dir: &Path) -> SiteConfig {
    SiteConfig {
        site_url: server.uri(),
        assets_dir: assets_dir.to_path_buf(),
        timeout_secs: 5.0,
        ..Default::default()
    }
}

fn archive_entry(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    text
}

fn downloader(config: SiteConfig) -> Downloader {
    let fetcher = HttpFetcher::new(config.timeout_secs, &config.user_agent).unwrap();
    Downloader::new(config, Box::new(fetcher)).unwrap()
}

#[tokio::test]
async fn crawls_index_and_toc_pages() {
    let server = fake_site().await;
    let assets = tempfile::tempdir().unwrap();
    let mathjax = assets.path().join("cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.1");
    std::fs::create_dir_all(&mathjax).unwrap();
    std::fs::write(mathjax.join("MathJax.js"), b"// local mathjax").unwrap();

    let book = downloader(config_for(&server, assets.path())).run().await.unwrap();

    assert_eq!(book.title(), Some("动手学深度学习"));
    assert_eq!(book.language(), "zh-CN");

    let spine: Vec<&str> = book.pages().iter().map(|p| p.path.as_str()).collect();
    assert_eq!(
        spine,
        vec![
            "index.html",
            "chapter_preface/index.html",
            "chapter_preface/install.html"
        ]
    );

    assert_eq!(book.toc().len(), 2);
    assert_eq!(book.toc()[0].children.len(), 2);

    assert_eq!(book.resource("_static/pygments.css").unwrap().media_type, "text/css");
    assert_eq!(
        book.resource("_static/jquery.js").unwrap().media_type,
        "application/javascript"
    );
    assert_eq!(book.resource("_images/cover.png").unwrap().data, b"\x89PNG");
    assert_eq!(book.resource("_images/preface.jpg").unwrap().media_type, "image/jpeg");
    assert!(book.resource("_images/broken.png").is_none());
    assert!(book.resource("_static/css/theme.css").is_none());
    assert!(book.resource("_static/google_analytics.js").is_none());

    let mathjax = book
        .resource("cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.1/MathJax.js")
        .unwrap();
    assert_eq!(mathjax.data, b"// local mathjax");
}

#[tokio::test]
async fn pages_reference_resources_inside_the_book() {
    let server = fake_site().await;
    let assets = tempfile::tempdir().unwrap();

    let book = downloader(config_for(&server, assets.path())).run().await.unwrap();

    let index = book.page("index.html").unwrap();
    assert!(index
        .xhtml
        .contains(r#"src="cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.1/MathJax.js""#));
    assert!(!index.xhtml.contains("SphinxRtdTheme"));

    let preface = book.page("chapter_preface/index.html").unwrap();
    assert_eq!(preface.title.as_deref(), Some("前言"));
    assert!(preface
        .xhtml
        .contains(r#"src="../cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.1/MathJax.js""#));
    assert!(preface.xhtml.contains(r#"href="../_static/pygments.css""#));
    assert!(preface.xhtml.contains(r#"<img src="../_images/preface.jpg"/>"#));
}

#[tokio::test]
async fn scripts_in_main_are_bundled_and_filtered() {
    let server = fake_site().await;
    let assets = tempfile::tempdir().unwrap();

    let book = downloader(config_for(&server, assets.path())).run().await.unwrap();

    assert_eq!(book.resource("_static/widget.js").unwrap().data, b"/* widget */");
    assert!(book.resource("_static/google_analytics.js").is_none());

    let install = book.page("chapter_preface/install.html").unwrap();
    assert!(install.xhtml.contains(r#"src="../_static/widget.js""#));
    assert!(install
        .xhtml
        .contains(r#"src="../cdnjs.cloudflare.com/ajax/libs/plot.js""#));
    assert!(install.xhtml.contains(r#"href="../_static/pygments.css""#));
    assert!(!install.xhtml.contains("google_analytics"));
    assert!(!install.xhtml.contains("?v="));
}

#[tokio::test]
async fn toc_in_subdirectory_index_resolves_against_it() {
    let server = MockServer::start().await;
    let html = "text/html; charset=utf-8";
    serve(&server, "/docs/index.html", 200, NESTED_INDEX.as_bytes(), html).await;
    serve(&server, "/docs/guide.html", 200, GUIDE.as_bytes(), html).await;
    let assets = tempfile::tempdir().unwrap();
    let config = SiteConfig {
        index_page: "docs/index.html".to_string(),
        ..config_for(&server, assets.path())
    };

    let book = downloader(config).run().await.unwrap();

    let spine: Vec<&str> = book.pages().iter().map(|p| p.path.as_str()).collect();
    assert_eq!(spine, vec!["docs/index.html", "docs/guide.html"]);
    assert_eq!(book.toc().len(), 1);
    assert_eq!(book.toc()[0].href, "docs/guide.html");
}

#[tokio::test]
async fn writes_epub_and_reports_outline() {
    let server = fake_site().await;
    let assets = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out = out_dir.path().join("gluon.epub");

    let book = downloader(config_for(&server, assets.path())).run().await.unwrap();
    book.write_epub(&out, true).unwrap();

    let opf = archive_entry(&out, "OEBPS/content.opf");
    for item in [
        "index.html",
        "chapter_preface/index.html",
        "chapter_preface/install.html",
        "_static/pygments.css",
        "_static/widget.js",
        "_images/cover.png",
    ] {
        assert!(opf.contains(&format!(r#"href="{}""#, item)), "{} not in manifest", item);
    }

    let nav = archive_entry(&out, "OEBPS/nav.xhtml");
    let install = nav.find(r#"href="chapter_preface/install.html""#).unwrap();
    let notation = nav.find(r#"href="chapter_preface/index.html#notation""#).unwrap();
    assert!(nav.find(r#"href="chapter_preface/index.html""#).unwrap() < install);
    assert!(install < notation);
    assert!(!nav.contains("chapter_missing"));

    let inline_toc = archive_entry(&out, "OEBPS/toc.xhtml");
    assert!(inline_toc.contains("安装"));
    assert!(inline_toc.contains("符号"));

    let (title, toc) = downloader(config_for(&server, assets.path()))
        .outline()
        .await
        .unwrap();
    assert_eq!(title, "动手学深度学习");
    assert_eq!(toc[0].title, "前言");
    assert_eq!(toc[1].href, "chapter_missing/index.html");
}

#[tokio::test]
async fn missing_index_page_fails() {
    let server = MockServer::start().await;
    let assets = tempfile::tempdir().unwrap();

    let result = downloader(config_for(&server, assets.path())).run().await;
    assert!(result.is_err());
}
