pub struct Icons;

impl Icons {
    pub const CRYSTAL: &str = "🔮";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
}
