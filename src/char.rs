pub trait CharExt {
    fn is_yaml_blank(self) -> bool;
    fn is_yaml_break(self) -> bool;
    fn is_blank_or_break(self) -> bool;
    fn is_flow_indicator(self) -> bool;
    fn is_anchor_char(self) -> bool;
}

impl CharExt for char {
    #[inline]
    fn is_yaml_blank(self) -> bool {
        self == ' ' || self == '\t'
    }

    #[inline]
    fn is_yaml_break(self) -> bool {
        self == '\n' || self == '\r'
    }

    #[inline]
    fn is_blank_or_break(self) -> bool {
        self.is_yaml_blank() || self.is_yaml_break()
    }

    #[inline]
    fn is_flow_indicator(self) -> bool {
        matches!(self, ',' | '[' | ']' | '{' | '}')
    }

    #[inline]
    fn is_anchor_char(self) -> bool {
        !self.is_blank_or_break() && !self.is_flow_indicator()
    }
}
