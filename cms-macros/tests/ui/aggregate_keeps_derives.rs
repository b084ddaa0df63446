use cms_macros::aggregate;

#[aggregate]
#[derive(Debug, Clone)]
struct Folder {
    path: String,
}

fn main() {
    let folder = Folder::default();
    let _ = folder.clone();
}
