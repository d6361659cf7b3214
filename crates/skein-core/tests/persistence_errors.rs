use skein_core::{Skein, SkeinError};

const NS: &str = "http://www.logicalshift.org.uk/IF/Skein";

fn item(id: &str, command: &str, children: &[&str]) -> String {
    let mut s = format!(
        "<item nodeId=\"{id}\">\
         <command xml:space=\"preserve\">{command}</command>\
         <result xml:space=\"preserve\"></result>\
         <commentary xml:space=\"preserve\"></commentary>\
         <played>NO</played><changed>NO</changed>\
         <temporary score=\"0\">YES</temporary>"
    );
    if !children.is_empty() {
        s.push_str("<children>");
        for child in children {
            s.push_str(&format!("<child nodeId=\"{child}\"/>"));
        }
        s.push_str("</children>");
    }
    s.push_str("</item>");
    s
}

/// A skein with one real node, for checking that failed loads change
/// nothing.
fn populated_skein() -> Skein {
    let mut skein = Skein::new();
    let root = skein.root();
    let a = skein.add_child(root).unwrap();
    skein.set_command(a, "survivor");
    skein.set_current(a);
    skein
}

fn assert_untouched(skein: &Skein) {
    assert_eq!(skein.tree().len(), 2);
    let a = skein.tree().children(skein.root())[0];
    assert_eq!(skein.node(a).unwrap().command(), "survivor");
    assert_eq!(skein.current(), a);
    assert!(skein.is_modified());
}

#[test]
fn test_missing_file_reports_io_error() {
    let mut skein = populated_skein();
    let err = skein
        .load_from_file("/nonexistent/path/story.skein")
        .unwrap_err();
    assert!(matches!(err, SkeinError::Io(_)), "{err}");
    assert_untouched(&skein);
}

#[test]
fn test_malformed_xml_is_rejected() {
    let mut skein = populated_skein();
    let err = skein
        .load_from_str(&format!("<Skein rootNode=\"r\" xmlns=\"{NS}\">"))
        .unwrap_err();
    assert!(!matches!(err, SkeinError::Io(_)), "{err}");
    assert_untouched(&skein);
}

#[test]
fn test_wrong_root_element_is_rejected() {
    let mut skein = populated_skein();
    let err = skein
        .load_from_str("<Transcript version=\"2\"></Transcript>")
        .unwrap_err();
    assert!(matches!(err, SkeinError::BadFormat(_)), "{err}");
    assert_untouched(&skein);
}

#[test]
fn test_missing_active_node_is_rejected() {
    let mut skein = populated_skein();
    let text = format!(
        "<Skein rootNode=\"r\" xmlns=\"{NS}\">{}</Skein>",
        item("r", "", &[])
    );
    let err = skein.load_from_str(&text).unwrap_err();
    assert!(matches!(err, SkeinError::BadFormat(_)), "{err}");
    assert_untouched(&skein);
}

#[test]
fn test_root_without_item_is_rejected() {
    let mut skein = populated_skein();
    let text = format!(
        "<Skein rootNode=\"missing\" xmlns=\"{NS}\">\
         <activeNode nodeId=\"missing\"/>{}</Skein>",
        item("r", "", &[])
    );
    let err = skein.load_from_str(&text).unwrap_err();
    assert!(matches!(err, SkeinError::BadFormat(_)), "{err}");
    assert_untouched(&skein);
}

#[test]
fn test_dangling_child_reference_is_rejected() {
    let mut skein = populated_skein();
    let text = format!(
        "<Skein rootNode=\"r\" xmlns=\"{NS}\">\
         <activeNode nodeId=\"r\"/>{}</Skein>",
        item("r", "", &["ghost"])
    );
    let err = skein.load_from_str(&text).unwrap_err();
    assert!(matches!(err, SkeinError::BadFormat(_)), "{err}");
    assert_untouched(&skein);
}

#[test]
fn test_child_cycle_is_rejected() {
    let mut skein = populated_skein();
    let text = format!(
        "<Skein rootNode=\"r\" xmlns=\"{NS}\">\
         <activeNode nodeId=\"r\"/>{}{}</Skein>",
        item("r", "", &["a"]),
        item("a", "loop", &["a"])
    );
    let err = skein.load_from_str(&text).unwrap_err();
    assert!(matches!(err, SkeinError::BadFormat(_)), "{err}");
    assert_untouched(&skein);
}

#[test]
fn test_dangling_active_node_is_rejected() {
    let mut skein = populated_skein();
    let text = format!(
        "<Skein rootNode=\"r\" xmlns=\"{NS}\">\
         <activeNode nodeId=\"nowhere\"/>{}</Skein>",
        item("r", "", &[])
    );
    let err = skein.load_from_str(&text).unwrap_err();
    assert!(matches!(err, SkeinError::BadFormat(_)), "{err}");
    assert_untouched(&skein);
}

#[test]
fn test_unreadable_score_is_rejected() {
    let mut skein = populated_skein();
    let text = format!(
        "<Skein rootNode=\"r\" xmlns=\"{NS}\">\
         <item nodeId=\"r\"><temporary score=\"many\">NO</temporary></item>\
         </Skein>"
    );
    let err = skein.load_from_str(&text).unwrap_err();
    assert!(matches!(err, SkeinError::BadFormat(_)), "{err}");
    assert_untouched(&skein);
}

#[test]
fn test_save_to_unwritable_path_keeps_modified_flag() {
    let mut skein = populated_skein();
    assert!(skein.is_modified());
    let err = skein
        .save_to_file("/nonexistent/directory/story.skein")
        .unwrap_err();
    assert!(matches!(err, SkeinError::Io(_)), "{err}");
    assert!(skein.is_modified());
}

#[test]
fn test_save_then_load_from_file() {
    let mut skein = populated_skein();
    let path = std::env::temp_dir().join(format!(
        "skein-core-test-{}.skein",
        std::process::id()
    ));
    skein.save_to_file(&path).unwrap();
    assert!(!skein.is_modified());

    let mut restored = Skein::new();
    restored.load_from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(restored.tree().len(), 2);
    let a = restored.tree().children(restored.root())[0];
    assert_eq!(restored.node(a).unwrap().command(), "survivor");
    assert_eq!(restored.current(), a);
}
