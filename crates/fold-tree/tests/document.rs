use fold_tree::{BraceLexer, FoldedDocument, FoldingState, RegionType};

const SOURCE: &str = "fn a() {\n    if x {\n        y();\n    }\n}\n";

fn offset_of_line(doc: &FoldedDocument<impl fold_tree::RegionLexer>, line: usize) -> usize {
    (0..line)
        .map(|l| doc.line_text(l).map_or(0, |t| t.chars().count()) + 1)
        .sum()
}

fn spans<L: fold_tree::RegionLexer>(doc: &FoldedDocument<L>) -> Vec<(usize, usize, RegionType)> {
    let tree = doc.tree();
    let mut out = Vec::new();
    let mut pending = vec![tree.root()];
    while let Some(id) = pending.pop() {
        let node = tree.get(id).expect("live node");
        if id != tree.root() {
            out.push((tree.start_line(id), tree.end_line(id), node.region_type()));
        }
        pending.extend(node.children().iter().rev().copied());
    }
    out
}

#[test]
fn test_initial_scan_builds_nested_regions() {
    let doc = FoldedDocument::new(SOURCE, BraceLexer);
    assert_eq!(doc.line_count(), 6);
    assert_eq!(spans(&doc), vec![(0, 4, 1), (1, 3, 1)]);
}

#[test]
fn test_inserting_a_line_inside_a_block_grows_it() {
    let mut doc = FoldedDocument::new(SOURCE, BraceLexer);
    let end_of_line_2 = offset_of_line(&doc, 3) - 1;

    let changed = doc.insert(end_of_line_2, "\n        z();").unwrap();

    assert!(!changed);
    assert_eq!(doc.line_text(3).as_deref(), Some("        z();"));
    assert_eq!(spans(&doc), vec![(0, 5, 1), (1, 4, 1)]);
    assert_eq!(doc.tree().pending_rescan_lines().count(), 0);
}

#[test]
fn test_folding_state_tracks_hidden_lines() {
    let mut doc = FoldedDocument::new(SOURCE, BraceLexer);
    doc.tree_mut().toggle_region_visibility(1);

    assert_eq!(
        doc.folding_state(),
        FoldingState {
            region_count: 2,
            hidden_line_count: 1,
            visible_line_count: 5,
        }
    );
}

#[test]
fn test_deleting_and_restoring_an_opening_line() {
    let mut doc = FoldedDocument::new(SOURCE, BraceLexer);
    let start = offset_of_line(&doc, 1);
    let end = offset_of_line(&doc, 2);

    // Without "if x {" the inner closer ends the function and the last brace is unmatched.
    assert!(doc.delete(start..end).unwrap());
    assert_eq!(doc.text(), "fn a() {\n        y();\n    }\n}\n");
    assert_eq!(spans(&doc), vec![(0, 2, 1), (3, 3, -1)]);
    assert!(doc.tree().line_info(3).invalid_block_end);

    assert!(doc.insert(start, "    if x {\n").unwrap());
    assert_eq!(doc.text(), SOURCE);
    assert_eq!(spans(&doc), vec![(0, 4, 1), (1, 3, 1)]);
}

#[test]
fn test_joining_lines_moves_tokens() {
    let mut doc = FoldedDocument::new("a {\n}\nb\n", BraceLexer);
    assert_eq!(spans(&doc), vec![(0, 1, 1)]);

    // Join "a {" and "}" into one line: a zero-span region.
    let newline = offset_of_line(&doc, 1) - 1;
    assert!(doc.delete(newline..newline + 1).unwrap());
    assert_eq!(doc.line_text(0).as_deref(), Some("a {}"));
    assert_eq!(spans(&doc), vec![(0, 0, 1)]);

    // Split it again.
    doc.insert(newline, "\n").unwrap();
    assert_eq!(spans(&doc), vec![(0, 1, 1)]);
}

#[test]
fn test_custom_lexer_closure() {
    let lexer = |_line: usize, text: &str| -> Vec<RegionType> {
        match text.trim() {
            "#region" => vec![2],
            "#endregion" => vec![-2],
            _ => Vec::new(),
        }
    };
    let doc = FoldedDocument::new("#region\nx\n#endregion\n", lexer);
    assert_eq!(spans(&doc), vec![(0, 2, 2)]);
}

#[test]
fn test_inserted_opening_line_takes_the_close() {
    let mut doc = FoldedDocument::new("{\n}\n", BraceLexer);

    assert!(doc.insert(2, "{\n").unwrap());

    assert_eq!(doc.text(), "{\n{\n}\n");
    assert_eq!(spans(&doc), vec![(0, 4, 1), (1, 2, 1)]);
    let outer = doc.tree().root();
    let outer = doc.tree().get(outer).expect("root").children()[0];
    assert!(!doc.tree().get(outer).expect("outer").end_line_valid());
    assert_eq!(
        doc.tree().debug_dump(),
        FoldedDocument::new(&doc.text(), BraceLexer).tree().debug_dump()
    );
}
