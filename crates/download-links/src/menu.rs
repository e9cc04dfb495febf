use std::sync::Arc;

use plate_core::{
    BubbleMenu, BubbleMenuItem, CommandMenuItem, Editor, IconName, LocalizedText, Node, Point,
    TextRange, ToolboxItem,
};

use crate::node::{DownloadLinksChain, NODE_KIND};

pub const TOOLBOX_PRIORITY: i64 = 122_520;
pub const DELETE_PRIORITY: i64 = 122_521;
pub const LINE_BREAK_PRIORITY: i64 = 122_522;

pub const BUBBLE_MENU_KEY: &str = "downloadLinksBubbleMenu";

pub const TITLE: LocalizedText = LocalizedText::new("插入下载信息", "Insert download links");
pub const KEYWORDS: [&str; 3] = ["url", "download", "云盘"];

pub const ICON: IconName = IconName("download-circle-outline");
pub const DELETE_ICON: IconName = IconName("delete-forever-outline");
pub const LINE_BREAK_ICON: IconName = IconName("arrow-u-left-bottom");

pub fn toolbox_item() -> ToolboxItem {
    ToolboxItem {
        priority: TOOLBOX_PRIORITY,
        icon: ICON,
        title: TITLE,
        action: Arc::new(|editor: &mut Editor| editor.chain().focus().add_download_links().run()),
    }
}

/// Removes the slash-trigger text, then inserts the block where it was.
pub fn command_menu_item() -> CommandMenuItem {
    CommandMenuItem {
        priority: TOOLBOX_PRIORITY,
        icon: ICON,
        title: TITLE,
        keywords: KEYWORDS.to_vec(),
        command: Arc::new(|editor: &mut Editor, range: TextRange| {
            editor
                .chain()
                .focus()
                .delete_range(range)
                .add_download_links()
                .run()
        }),
    }
}

pub fn bubble_menu() -> BubbleMenu {
    BubbleMenu::new(
        BUBBLE_MENU_KEY,
        |editor: &Editor| editor.is_active(NODE_KIND),
        vec![
            BubbleMenuItem {
                priority: DELETE_PRIORITY,
                icon: DELETE_ICON,
                title: LocalizedText::new("删除", "Delete"),
                action: Arc::new(delete_active),
            },
            BubbleMenuItem {
                priority: LINE_BREAK_PRIORITY,
                icon: LINE_BREAK_ICON,
                title: LocalizedText::new("换行", "Line break"),
                action: Arc::new(insert_line_break_after),
            },
        ],
    )
}

pub fn delete_active(editor: &mut Editor) -> bool {
    editor
        .run_command(
            "core.delete_node",
            Some(serde_json::json!({ "kind": NODE_KIND })),
        )
        .is_ok()
}

/// Opens an empty paragraph right after the active block and moves the
/// caret into it.
pub fn insert_line_break_after(editor: &mut Editor) -> bool {
    let Some(mut path) = editor.active_node_path(NODE_KIND) else {
        return false;
    };
    let Some(last) = path.last_mut() else {
        return false;
    };
    *last += 1;

    let mut caret = path.clone();
    caret.push(0);

    editor
        .chain()
        .insert_content_at(path, vec![Node::paragraph("")], true)
        .focus_at(Point::new(caret, 0), true)
        .run()
}
