use std::sync::Arc;

use plate_core::{
    BubbleMenu, BubbleMenuItem, EDITOR_EXTENSION_CREATE, Editor, ExtensionPoints, IconName,
    LocalizedText, Locale, PlatePlugin, PluginRegistry, ToolboxItem,
};

struct ToolboxPlugin {
    id: &'static str,
    priority: i64,
}

impl PlatePlugin for ToolboxPlugin {
    fn id(&self) -> &'static str {
        self.id
    }

    fn toolbox_items(&self) -> Vec<ToolboxItem> {
        vec![ToolboxItem {
            priority: self.priority,
            icon: IconName("dot"),
            title: LocalizedText::new("点", self.id),
            action: Arc::new(|_: &mut Editor| true),
        }]
    }
}

#[test]
fn contributed_extensions_are_registered_after_core() {
    let mut points = ExtensionPoints::new();
    points.contribute_editor_extensions("late", || {
        vec![Box::new(ToolboxPlugin { id: "late", priority: 20 }) as Box<dyn PlatePlugin>]
    });
    points.contribute_editor_extensions("early", || {
        vec![Box::new(ToolboxPlugin { id: "early", priority: 10 }) as Box<dyn PlatePlugin>]
    });

    assert_eq!(points.contributors(EDITOR_EXTENSION_CREATE), vec!["late", "early"]);
    assert!(points.contributors("other:point").is_empty());

    let registry = PluginRegistry::with_extensions(&points).unwrap();
    let titles: Vec<_> = registry
        .toolbox_items()
        .iter()
        .map(|item| item.title.get(Locale::EnUs))
        .collect();
    assert_eq!(titles, vec!["early", "late"]);
    assert!(registry.command("core.insert_content").is_some());
}

#[test]
fn hidden_bubble_menu_refuses_items() {
    struct MenuPlugin;

    impl PlatePlugin for MenuPlugin {
        fn id(&self) -> &'static str {
            "test.menu"
        }

        fn bubble_menus(&self) -> Vec<BubbleMenu> {
            vec![BubbleMenu::new(
                "testMenu",
                |editor: &Editor| editor.is_focused(),
                vec![
                    BubbleMenuItem {
                        priority: 2,
                        icon: IconName("b"),
                        title: LocalizedText::new("乙", "b"),
                        action: Arc::new(|_: &mut Editor| true),
                    },
                    BubbleMenuItem {
                        priority: 1,
                        icon: IconName("a"),
                        title: LocalizedText::new("甲", "a"),
                        action: Arc::new(|editor: &mut Editor| {
                            editor.blur();
                            true
                        }),
                    },
                ],
            )]
        }
    }

    let mut registry = PluginRegistry::core();
    registry.register_plugin(Box::new(MenuPlugin)).unwrap();
    let menu = registry.bubble_menu("testMenu").unwrap().clone();
    let mut editor = Editor::with_registry(registry);

    assert_eq!(menu.items()[0].title.get(Locale::ZhCn), "甲");
    assert!(!menu.is_visible(&editor));
    assert!(!menu.invoke(&mut editor, 0));

    editor.focus(None, false);
    assert!(menu.invoke(&mut editor, 0));
    assert!(!editor.is_focused());
    assert!(!menu.invoke(&mut editor, 5));
}

#[test]
fn duplicate_bubble_menu_keys_are_rejected() {
    struct Twice;

    impl PlatePlugin for Twice {
        fn id(&self) -> &'static str {
            "test.twice"
        }

        fn bubble_menus(&self) -> Vec<BubbleMenu> {
            vec![BubbleMenu::new("same", |_: &Editor| true, Vec::new())]
        }
    }

    let mut registry = PluginRegistry::core();
    registry.register_plugin(Box::new(Twice)).unwrap();
    let err = registry.register_plugin(Box::new(Twice)).unwrap_err();
    assert_eq!(err, "Duplicate bubble menu key: same");
}
