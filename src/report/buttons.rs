use serde::Serialize;

/// 按钮位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPosition {
    Header,
    Body,
    Footer,
}

/// 带回调数据的按钮
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

/// 导航按钮布局：页眉一行，正文按列折行，页脚一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Navigation {
    pub rows: Vec<Vec<Button>>,
}

impl Navigation {
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    pub fn labels(&self) -> Vec<String> {
        self.buttons().map(|b| b.label.clone()).collect()
    }

    pub fn find(&self, label: &str) -> Option<&Button> {
        self.buttons().find(|b| b.label == label)
    }
}

#[derive(Debug, Default)]
pub struct ButtonMaker {
    header: Vec<Button>,
    body: Vec<Button>,
    footer: Vec<Button>,
}

impl ButtonMaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_button(&mut self, label: impl ToString, payload: impl Into<String>, position: ButtonPosition) {
        let button = Button {
            label: label.to_string(),
            payload: payload.into(),
        };
        match position {
            ButtonPosition::Header => self.header.push(button),
            ButtonPosition::Body => self.body.push(button),
            ButtonPosition::Footer => self.footer.push(button),
        }
    }

    // 正文按钮每行最多 columns 个
    pub fn build_menu(self, columns: usize) -> Navigation {
        let columns = columns.max(1);
        let mut rows = Vec::new();
        if !self.header.is_empty() {
            rows.push(self.header);
        }
        rows.extend(self.body.chunks(columns).map(|row| row.to_vec()));
        if !self.footer.is_empty() {
            rows.push(self.footer);
        }
        Navigation { rows }
    }
}
