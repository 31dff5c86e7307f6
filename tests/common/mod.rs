/*!
 * Common test utilities for the dtbsync test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use tempfile::TempDir;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Route log output through the test harness
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One `audio` element of a playback group
pub struct Clip<'a> {
    pub src: &'a str,
    pub begin: &'a str,
    pub end: &'a str,
}

/// Shorthand for a clip
pub fn clip<'a>(src: &'a str, begin: &'a str, end: &'a str) -> Clip<'a> {
    Clip { src, begin, end }
}

/// A `par` element with one text reference and the given clips
pub fn par(id: &str, text_src: &str, text_id: &str, clips: &[Clip<'_>]) -> String {
    let audio: String = clips
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "<audio src=\"{}\" clip-begin=\"npt={}s\" clip-end=\"npt={}s\" id=\"{}_a{}\"/>",
                c.src, c.begin, c.end, id, i
            )
        })
        .collect();
    format!(
        "<par endsync=\"last\" id=\"{}\"><text src=\"{}\" id=\"{}\"/>{}</par>",
        id, text_src, text_id, audio
    )
}

/// A SMIL timing document holding the given groups in one `seq`
pub fn smil_document(pars: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"iso-8859-1\"?>\n\
         <!DOCTYPE smil PUBLIC \"-//W3C//DTD SMIL 1.0//EN\" \"http://www.w3.org/TR/REC-smil/SMIL10.dtd\">\n\
         <smil>\n  <head>\n    <meta name=\"dc:format\" content=\"Daisy 2.02\"/>\n  </head>\n\
         <body>\n<seq dur=\"10.0s\">\n{}\n</seq>\n</body>\n</smil>\n",
        pars.join("\n")
    )
}

/// A navigation document whose headings link to `links`
pub fn ncc_document(links: &[&str]) -> String {
    let headings: String = links
        .iter()
        .enumerate()
        .map(|(i, href)| format!("<h{level} id=\"h{i}\"><a href=\"{href}\">Heading {i}</a></h{level}>\n", level = i % 6 + 1))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\">\n<head><title>Hodja</title></head>\n<body>\n{}</body>\n</html>\n",
        headings
    )
}

/// A text document with the given `(id, content)` paragraphs
pub fn text_document(lang: &str, paragraphs: &[(&str, &str)]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|(id, content)| format!("<p id=\"{}\">{}</p>\n", id, content))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{}\">\n<body>\n{}</body>\n</html>\n",
        lang, body
    )
}

/// A book written to a temporary directory
pub struct TestBook {
    pub dir: TempDir,
    pub ncc: PathBuf,
}

impl TestBook {
    /// Write `ncc.html` plus the given documents
    pub fn new(ncc: &str, documents: &[(&str, String)]) -> Result<Self> {
        let dir = create_temp_dir()?;
        for (name, content) in documents {
            create_test_file(dir.path(), name, content)?;
        }
        let ncc = create_test_file(dir.path(), "ncc.html", ncc)?;
        Ok(Self { dir, ncc })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn read(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.path(name))?)
    }
}

/// Text of the sample book's first group
pub const FIRST_TEXT: &str = "Nå, sagde Hodja.";

/// A small book: one timing document with three groups over `text.html`.
///
/// - `p1` covers a sentence of three words
/// - `p2` covers a single word
/// - `p3` covers two words, spread over two contiguous clips
pub fn sample_book() -> Result<TestBook> {
    let smil = smil_document(&[
        par("p1", "text.html#t1", "t1", &[clip("x.mp3", "105.399", "108.758")]),
        par("p2", "text.html#t2", "t2", &[clip("x.mp3", "108.758", "109.500")]),
        par(
            "p3",
            "text.html#t3",
            "t3",
            &[clip("x.mp3", "109.500", "110.000"), clip("x.mp3", "110.000", "111.250")],
        ),
    ]);
    let text = text_document("da", &[("t1", FIRST_TEXT), ("t2", "Farvel"), ("t3", "Godt gjort")]);
    TestBook::new(
        &ncc_document(&["hod_0001.smil#p1"]),
        &[("hod_0001.smil", smil), ("text.html", text)],
    )
}
