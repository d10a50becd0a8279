use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub background: String,
    pub grid_line_color: String,
    pub grid_line_width: f32,
    pub border_color: String,
    pub border_width: f32,
    pub gutter_background: String,
    pub coordinate_color: String,
    pub coordinate_font_size: f32,
    pub title_color: String,
    pub title_font_size: f32,
    pub info_color: String,
    pub info_font_size: f32,
    pub obstacle_stroke: String,
    pub obstacle_opacity: f32,
    pub obstacle_text_color: String,
    pub label_font_size: f32,
    pub label_small_font_size: f32,
    pub chair_label_font_size: f32,
    pub chair_text_color: String,
    pub chair_marker_color: String,
    pub chair_marker_opacity: f32,
    pub print_label_font_size: f32,
    pub print_chair_label_font_size: f32,
    pub print_chair_text_color: String,
    pub label_line_height: f32,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "Arial, sans-serif".to_string(),
            background: "#FFFFFF".to_string(),
            grid_line_color: "#D1D5DB".to_string(),
            grid_line_width: 0.5,
            border_color: "#1F2937".to_string(),
            border_width: 2.0,
            gutter_background: "#F3F4F6".to_string(),
            coordinate_color: "#4B5563".to_string(),
            coordinate_font_size: 10.0,
            title_color: "#000000".to_string(),
            title_font_size: 16.0,
            info_color: "#333333".to_string(),
            info_font_size: 12.0,
            obstacle_stroke: "#4B5563".to_string(),
            obstacle_opacity: 0.8,
            obstacle_text_color: "#333333".to_string(),
            label_font_size: 12.0,
            label_small_font_size: 8.0,
            chair_label_font_size: 10.0,
            chair_text_color: "#000000".to_string(),
            chair_marker_color: "#374151".to_string(),
            chair_marker_opacity: 0.6,
            print_label_font_size: 9.0,
            print_chair_label_font_size: 8.0,
            print_chair_text_color: "#FFFFFF".to_string(),
            label_line_height: 1.1,
        }
    }

    /// White-on-blue drafting palette.
    pub fn blueprint() -> Self {
        Self {
            background: "#0B3D91".to_string(),
            grid_line_color: "#5C7FC4".to_string(),
            border_color: "#FFFFFF".to_string(),
            gutter_background: "#0A357F".to_string(),
            coordinate_color: "#C9D7F5".to_string(),
            title_color: "#FFFFFF".to_string(),
            info_color: "#E3EBFB".to_string(),
            obstacle_stroke: "#FFFFFF".to_string(),
            obstacle_opacity: 0.35,
            obstacle_text_color: "#FFFFFF".to_string(),
            chair_text_color: "#FFFFFF".to_string(),
            chair_marker_color: "#FFFFFF".to_string(),
            ..Self::classic()
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "classic" | "default" => Some(Self::classic()),
            "blueprint" => Some(Self::blueprint()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
