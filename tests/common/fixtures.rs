/// One `<node>` of a uiautomator dump: class, text, content-desc, bounds.
pub type Node<'a> = (&'a str, &'a str, &'a str, &'a str);

fn attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Build a flat hierarchy dump under a root FrameLayout.
pub fn hierarchy(nodes: &[Node]) -> String {
    let mut xml = String::from(
        "<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>\n<hierarchy rotation=\"0\">\n",
    );
    xml.push_str(
        "  <node index=\"0\" text=\"\" resource-id=\"\" class=\"android.widget.FrameLayout\" \
         package=\"com.pressingly.moneta.staging\" content-desc=\"\" bounds=\"[0,0][1440,3120]\">\n",
    );
    for (i, (class, text, desc, bounds)) in nodes.iter().enumerate() {
        xml.push_str(&format!(
            "    <node index=\"{}\" text=\"{}\" resource-id=\"\" class=\"{}\" \
             package=\"com.pressingly.moneta.staging\" content-desc=\"{}\" bounds=\"{}\" />\n",
            i,
            attr(text),
            class,
            attr(desc),
            bounds
        ));
    }
    xml.push_str("  </node>\n</hierarchy>");
    xml
}

/// Home screen after sign-in: user, organization and bottom navigation.
pub fn home_screen() -> String {
    hierarchy(&[
        ("android.widget.TextView", "Quy Nguyen", "", "[64,200][800,280]"),
        ("android.widget.TextView", "[STG] US Airlines", "", "[64,300][900,360]"),
        ("android.widget.TextView", "Balance", "", "[64,500][400,560]"),
        ("android.widget.Button", "", "Explore", "[0,2700][400,2812]"),
        ("android.widget.Button", "", "Purchases", "[400,2700][800,2812]"),
        ("android.widget.Button", "", "Preferences", "[1040,2840][1360,2952]"),
    ])
}

/// Preferences screen listing the four spending policies.
pub fn preferences_screen() -> String {
    hierarchy(&[
        ("android.widget.TextView", "Preferences", "", "[64,150][600,230]"),
        (
            "android.widget.Switch",
            "Approve first transaction from a publisher",
            "",
            "[0,560][1280,640]",
        ),
        (
            "android.widget.TextView",
            "Alert or approve transactions exceeding",
            "",
            "[0,660][1280,720]",
        ),
        (
            "android.widget.TextView",
            "Alert or approve transactions if total spending exceeds",
            "",
            "[0,840][1280,900]",
        ),
        (
            "android.widget.TextView",
            "Set spending limit for publishers",
            "",
            "[0,1060][1280,1130]",
        ),
    ])
}

/// A screen with fewer labeled elements than a loaded app shows.
pub fn splash_screen() -> String {
    hierarchy(&[
        ("android.widget.ImageView", "", "Moneta", "[520,1400][920,1800]"),
        ("android.widget.ProgressBar", "", "", "[620,1900][820,2100]"),
    ])
}
